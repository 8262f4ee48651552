use crate::models::{Message, Role};

pub const BEGIN_RESPONSE: &str = "---BEGIN AI RESPONSE";
pub const END_RESPONSE: &str = "---END AI RESPONSE";

/// Split a transcript into alternating user/assistant turns.
///
/// Sentinel lines must match exactly and are not part of any content. Every
/// other line is kept with a `\n` appended. The turn open at the end of input
/// is always emitted, so the result is never empty.
pub fn parse(input: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut role = Role::User;
    let mut content = String::new();

    for line in input.split('\n') {
        match line {
            BEGIN_RESPONSE => {
                messages.push(Message::new(role, std::mem::take(&mut content)));
                role = Role::Assistant;
            }
            END_RESPONSE => {
                messages.push(Message::new(role, std::mem::take(&mut content)));
                role = Role::User;
            }
            _ => {
                content.push_str(line);
                content.push('\n');
            }
        }
    }

    messages.push(Message::new(role, content));
    messages
}

/// Parse line-terminated text, such as a normalized stdin buffer.
pub fn parse_document(text: &str) -> Vec<Message> {
    parse(text.strip_suffix('\n').unwrap_or(text))
}

/// Rebuild raw input so that every line, including the last, ends in `\n`.
pub fn normalize(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len() + 1);
    for line in raw.lines() {
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    /// Joins turns back together with the sentinel that opened each one.
    fn render(messages: &[Message]) -> String {
        let mut text = String::new();
        for (i, message) in messages.iter().enumerate() {
            if i > 0 {
                let sentinel = match message.role {
                    Role::Assistant => BEGIN_RESPONSE,
                    _ => END_RESPONSE,
                };
                text.push_str(sentinel);
                text.push('\n');
            }
            text.push_str(&message.content);
        }
        text
    }

    #[test]
    fn plain_text_is_one_user_turn() {
        for input in ["Hi", "line one\nline two", "", "trailing\n"] {
            let messages = parse(input);
            assert_eq!(messages, vec![Message::new(Role::User, format!("{input}\n"))]);
        }
    }

    #[test]
    fn begin_and_end_split_into_three_turns() {
        let input = "question\n---BEGIN AI RESPONSE\nanswer\nmore\n---END AI RESPONSE\nfollow up";
        let messages = parse(input);

        assert_eq!(roles(&messages), vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[0].content, "question\n");
        assert_eq!(messages[1].content, "answer\nmore\n");
        assert_eq!(messages[2].content, "follow up\n");
    }

    #[test]
    fn open_response_ends_on_assistant_turn() {
        let messages = parse("question\n---BEGIN AI RESPONSE\npartial");
        assert_eq!(roles(&messages), vec![Role::User, Role::Assistant]);
        assert_eq!(messages[1].content, "partial\n");
    }

    #[test]
    fn consecutive_sentinels_keep_empty_turns() {
        let messages = parse("---BEGIN AI RESPONSE\n---END AI RESPONSE");
        assert_eq!(roles(&messages), vec![Role::User, Role::Assistant, Role::User]);
        assert!(messages.iter().all(|m| m.content.is_empty()));

        let messages = parse("a\n---END AI RESPONSE\n---END AI RESPONSE\nb");
        assert_eq!(roles(&messages), vec![Role::User, Role::User, Role::User]);
        assert_eq!(messages[1].content, "");
    }

    #[test]
    fn sentinels_must_match_whole_line() {
        let input = " ---BEGIN AI RESPONSE\n---END AI RESPONSE \nsee ---BEGIN AI RESPONSE here";
        let messages = parse(input);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, format!("{input}\n"));
    }

    #[test]
    fn rendered_turns_parse_back_identically() {
        let inputs = [
            "q\n---BEGIN AI RESPONSE\na\n---END AI RESPONSE\nq2\n",
            "---BEGIN AI RESPONSE\n---END AI RESPONSE\n",
            "x\n\n---BEGIN AI RESPONSE\n\ny\n",
            "only user text\n",
        ];
        for input in inputs {
            let messages = parse_document(input);
            let rendered = render(&messages);
            assert_eq!(rendered, input);
            assert_eq!(parse_document(&rendered), messages);
        }
    }

    #[test]
    fn document_drops_final_line_terminator() {
        assert_eq!(parse_document("Hi\n"), vec![Message::new(Role::User, "Hi\n")]);
        assert_eq!(parse_document(""), vec![Message::new(Role::User, "\n")]);
    }

    #[test]
    fn normalize_terminates_every_line() {
        assert_eq!(normalize("Hi"), "Hi\n");
        assert_eq!(normalize("Hi\n"), "Hi\n");
        assert_eq!(normalize("a\r\nb\r\n"), "a\nb\n");
        assert_eq!(normalize(""), "");
    }
}
