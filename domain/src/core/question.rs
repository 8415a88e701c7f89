//! Question value object
//!
//! A question is either free text or a set of images (photographed homework
//! pages, scanned exam sheets). The solver never mixes the two: an image
//! question carries its text only implicitly, inside the pictures.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// An image attached to a question: raw bytes plus the declared MIME type.
///
/// Validation (size limits, MIME sniffing) happens upstream; the domain
/// treats the attachment as opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data: Vec<u8>,
    pub mime: String,
}

impl ImageAttachment {
    pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            data,
            mime: mime.into(),
        }
    }
}

/// A question to be solved (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Question {
    /// Plain text question.
    Text(String),
    /// One or more images containing the question.
    Images(Vec<ImageAttachment>),
}

impl Question {
    /// Create a text question, rejecting blank text
    pub fn try_text(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            Err(DomainError::InvalidQuestion(
                "question text is empty".to_string(),
            ))
        } else {
            Ok(Self::Text(content))
        }
    }

    /// Create an image question, rejecting an empty image set
    pub fn try_images(images: Vec<ImageAttachment>) -> Result<Self, DomainError> {
        if images.is_empty() {
            Err(DomainError::InvalidQuestion(
                "image set is empty".to_string(),
            ))
        } else {
            Ok(Self::Images(images))
        }
    }

    /// The question text, if this is a text question
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(content) => Some(content),
            Self::Images(_) => None,
        }
    }

    /// The attached images, if this is an image question
    pub fn images(&self) -> Option<&[ImageAttachment]> {
        match self {
            Self::Text(_) => None,
            Self::Images(images) => Some(images),
        }
    }

    pub fn is_image_based(&self) -> bool {
        matches!(self, Self::Images(_))
    }
}

impl From<&str> for Question {
    fn from(s: &str) -> Self {
        Question::Text(s.to_string())
    }
}

impl From<String> for Question {
    fn from(s: String) -> Self {
        Question::Text(s)
    }
}
