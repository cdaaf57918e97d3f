/// One completed exchange of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub user: String,
    pub response: String,
}

/// Baichuan2 chat prompt in the `[INST] <<SYS>>` layout.
///
/// The very first piece of user text (the first turn, or `message` when
/// there is no history) is kept verbatim; everything after it is trimmed.
pub fn build_prompt(message: &str, history: &[ChatTurn], system_prompt: &str) -> String {
    let mut prompt = format!("<s>[INST] <<SYS>>\n{}\n<</SYS>>\n\n", system_prompt);
    for (i, turn) in history.iter().enumerate() {
        let user = if i == 0 { turn.user.as_str() } else { turn.user.trim() };
        prompt.push_str(&format!(
            "{} [/INST] {} </s><s>[INST] ",
            user,
            turn.response.trim()
        ));
    }
    let message = if history.is_empty() { message } else { message.trim() };
    prompt.push_str(&format!("{} [/INST]", message));
    prompt
}
