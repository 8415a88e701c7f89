//! Prompt templates for the solve and debate flows.
//!
//! Templates vary over {image-based, text-based} × {initial, refinement,
//! review}. Every solve template embeds the `题目:` / `解答:` output format
//! so results can be pattern-extracted downstream; a prompt is immutable
//! once built for a given call.

/// Maximum conversation turns embedded in a follow-up prompt. Older turns
/// are dropped, most recent kept.
pub const MAX_HISTORY_TURNS: usize = 20;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "学生",
            TurnRole::Assistant => "老师",
        }
    }
}

/// One prior turn of a follow-up conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

const OUTPUT_FORMAT: &str = r#"请严格按照以下格式输出：

题目：<完整的题目内容>

解答：<详细的解题过程和最终答案>"#;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Initial prompt for an image-based question. The images themselves
    /// travel as separate message parts; this is the accompanying text.
    pub fn image_initial(extra: Option<&str>) -> String {
        let mut prompt = format!(
            r#"你是一位经验丰富的学科老师。请仔细识别图片中的题目，然后给出完整、严谨的解答。

{OUTPUT_FORMAT}"#
        );
        Self::append_extra(&mut prompt, extra);
        prompt
    }

    /// Initial prompt for a text-based question.
    pub fn text_initial(question: &str, extra: Option<&str>) -> String {
        let mut prompt = format!(
            r#"你是一位经验丰富的学科老师。请解答下面的题目，给出完整、严谨的解题过程。

题目内容：
{question}

{OUTPUT_FORMAT}"#
        );
        Self::append_extra(&mut prompt, extra);
        prompt
    }

    /// Refinement prompt for proposer rounds after the first: embeds the
    /// prior answer and the reviewer's critique. For text questions the
    /// literal question is restated; image questions re-attach the images.
    pub fn refinement(
        question: Option<&str>,
        prior_answer: &str,
        verdict: &str,
        extra: Option<&str>,
    ) -> String {
        let mut prompt = String::new();
        prompt.push_str("你之前的解答收到了审查意见，请据此修正并给出改进后的完整解答。\n");
        if let Some(q) = question {
            prompt.push_str(&format!("\n题目内容：\n{q}\n"));
        }
        prompt.push_str(&format!(
            r#"
你之前的解答：
{prior_answer}

审查意见：
{verdict}

{OUTPUT_FORMAT}"#
        ));
        Self::append_extra(&mut prompt, extra);
        prompt
    }

    /// Review prompt for the reviewer: critiques the candidate answer.
    /// For text-only questions the literal question text is embedded,
    /// since there is no image to re-derive context from.
    pub fn review(question: Option<&str>, candidate: &str) -> String {
        let mut prompt = String::from(
            "你是一位严格的审查老师。请审查下面这份解答是否正确、完整、表述清晰。\n",
        );
        if let Some(q) = question {
            prompt.push_str(&format!("\n题目内容：\n{q}\n"));
        }
        prompt.push_str(&format!(
            r#"
待审查的解答：
{candidate}

如果解答完全正确且无需改进，请仅回复：APPROVED
否则请具体指出错误和需要改进之处。"#
        ));
        prompt
    }

    // ==================== Follow-up Templates ====================

    /// Follow-up prompt over an existing question/answer pair plus prior
    /// conversation. History is truncated to [`MAX_HISTORY_TURNS`].
    pub fn follow_up(
        base_question: &str,
        base_answer: &str,
        history: &[ConversationTurn],
        prompt: &str,
    ) -> String {
        format!(
            r#"你是一位耐心的学科老师，正在就一道已解答的题目回答学生的追问。

原题目：
{base_question}

原解答：
{base_answer}
{history}
学生的追问：
{prompt}

请直接针对追问作答，解释清楚、详略得当。"#,
            history = Self::history_block(history),
        )
    }

    /// Refinement prompt for follow-up debate rounds after the first.
    pub fn follow_up_refinement(prompt: &str, prior_answer: &str, verdict: &str) -> String {
        format!(
            r#"你对学生追问的回答收到了审查意见，请据此修正。

学生的追问：
{prompt}

你之前的回答：
{prior_answer}

审查意见：
{verdict}

请给出改进后的完整回答。"#
        )
    }

    /// Review prompt for follow-up debate rounds: checks that the answer
    /// actually addresses the follow-up prompt, not just that it is
    /// correct in isolation.
    pub fn follow_up_review(prompt: &str, candidate: &str) -> String {
        format!(
            r#"你是一位严格的审查老师。请审查下面的回答是否切实回应了学生的追问，且内容正确。

学生的追问：
{prompt}

待审查的回答：
{candidate}

如果回答切题且正确，请仅回复：APPROVED
否则请具体指出问题。"#
        )
    }

    fn history_block(history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            return "\n".to_string();
        }
        let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
        let mut block = String::from("\n历史对话：\n");
        for turn in &history[start..] {
            block.push_str(&format!("{}：{}\n", turn.role.label(), turn.content));
        }
        block.push('\n');
        block
    }

    fn append_extra(prompt: &mut String, extra: Option<&str>) {
        if let Some(extra) = extra
            && !extra.trim().is_empty()
        {
            prompt.push_str(&format!("\n\n补充要求：\n{extra}"));
        }
    }
}
