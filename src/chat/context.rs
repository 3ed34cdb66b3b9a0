//! Memory retrieval and prompt assembly for a single exchange.

use crate::config::ChatConfig;
use crate::memory::service::MemoryStore;
use crate::memory::types::Memory;

const PERSONA: &str = "\
You are Gemi, a warm and empathetic AI diary companion. You're having a private \
conversation with your user in their personal journal app. Everything shared stays \
completely private on their device.

Your personality:
- Warm, supportive, and encouraging like a trusted friend
- Reflective and thoughtful, helping users explore their feelings
- Non-judgmental and accepting of all emotions and experiences
- Gently curious, asking follow-up questions to help users reflect deeper
- Celebrating small victories and providing comfort during difficult times

Remember to:
- Keep responses conversational and personal, not clinical
- Use warm, friendly language that feels like chatting with a close friend
- Acknowledge emotions and validate feelings
- Offer gentle prompts for deeper reflection when appropriate
- Reference past conversations naturally when relevant";

const MEMORY_HEADER: &str = "Things you remember about your friend from earlier conversations:";

const CLOSING: &str =
    "Respond as Gemi with warmth and empathy, keeping the conversation natural and supportive.";

/// Size limits for the memory section of a prompt, counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    /// Total for all memory lines together, list markers and newlines included.
    pub total_chars: usize,
    /// Cap for any single memory, the trailing `...` included.
    pub per_memory_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            total_chars: 6000,
            per_memory_chars: 800,
        }
    }
}

impl From<&ChatConfig> for PromptBudget {
    fn from(config: &ChatConfig) -> Self {
        Self {
            total_chars: config.prompt_char_budget,
            per_memory_chars: config.memory_char_limit,
        }
    }
}

/// Search the store for memories related to `query`, most relevant first.
///
/// Storage failures are logged and yield no memories; the exchange goes on without them.
pub async fn retrieve_relevant_memories(
    store: &dyn MemoryStore,
    query: &str,
    limit: usize,
) -> Vec<Memory> {
    if limit == 0 {
        return Vec::new();
    }
    match store.search_memories(query, limit).await {
        Ok(mut memories) => {
            memories.truncate(limit);
            tracing::debug!(count = memories.len(), "memories retrieved");
            memories
        }
        Err(e) => {
            tracing::warn!(error = %e, "memory retrieval failed, continuing without context");
            Vec::new()
        }
    }
}

/// Cut `text` to at most `max` chars, marking the cut with `...`.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut clipped: String = text.chars().take(max - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Build the prompt: persona, remembered context in the given order, then the
/// user's message verbatim.
pub fn create_prompt_with_memory(
    user_message: &str,
    memories: &[String],
    budget: &PromptBudget,
) -> String {
    let mut prompt = String::with_capacity(PERSONA.len() + user_message.len() + 512);
    prompt.push_str(PERSONA);
    prompt.push_str("\n\n");

    let mut used = 0;
    let mut lines = Vec::new();
    for memory in memories {
        let memory = memory.trim();
        if memory.is_empty() {
            continue;
        }
        let line = format!("- {}\n", clip(memory, budget.per_memory_chars));
        let size = line.chars().count();
        if used + size > budget.total_chars {
            tracing::debug!(
                kept = lines.len(),
                dropped = memories.len() - lines.len(),
                "memory section hit its budget"
            );
            break;
        }
        used += size;
        lines.push(line);
    }

    if !lines.is_empty() {
        prompt.push_str(MEMORY_HEADER);
        prompt.push('\n');
        for line in &lines {
            prompt.push_str(line);
        }
        prompt.push('\n');
    }

    prompt.push_str("Your friend writes: \"");
    prompt.push_str(user_message);
    prompt.push_str("\"\n\n");
    prompt.push_str(CLOSING);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memories_precede_message_in_order() {
        let prompt = create_prompt_with_memory(
            "How was my week?",
            &["A: went hiking".to_string(), "B: started pottery".to_string()],
            &PromptBudget::default(),
        );
        let a = prompt.find("A: went hiking").unwrap();
        let b = prompt.find("B: started pottery").unwrap();
        let msg = prompt.find("How was my week?").unwrap();
        assert!(a < b && b < msg);
        assert!(prompt.starts_with("You are Gemi"));
    }

    #[test]
    fn no_memories_means_no_context_section() {
        let prompt = create_prompt_with_memory("Hi", &[], &PromptBudget::default());
        assert!(!prompt.contains(MEMORY_HEADER));
        assert!(prompt.contains("Your friend writes: \"Hi\""));
        assert!(prompt.ends_with(CLOSING));
    }

    #[test]
    fn deterministic() {
        let memories = vec!["likes tea".to_string()];
        let budget = PromptBudget::default();
        assert_eq!(
            create_prompt_with_memory("hello", &memories, &budget),
            create_prompt_with_memory("hello", &memories, &budget)
        );
    }

    #[test]
    fn budget_caps_each_memory_and_the_section() {
        let budget = PromptBudget {
            total_chars: 30,
            per_memory_chars: 12,
        };
        let memories = vec![
            "first memory that is long".to_string(),
            "second one".to_string(),
            "third memory gets dropped".to_string(),
        ];
        let prompt = create_prompt_with_memory("msg", &memories, &budget);
        assert!(prompt.contains("- first mem...\n"));
        assert!(prompt.contains("- second one\n"));
        assert!(!prompt.contains("third"));
    }

    #[test]
    fn memory_section_fits_its_budget_in_chars() {
        let budget = PromptBudget {
            total_chars: 100,
            per_memory_chars: 20,
        };
        let memories: Vec<String> = (0..10).map(|i| format!("{i} é日記 ").repeat(10)).collect();
        let prompt = create_prompt_with_memory("msg", &memories, &budget);

        let section = prompt
            .split_once(MEMORY_HEADER)
            .and_then(|(_, rest)| rest.split_once("\n\nYour friend writes"))
            .map(|(section, _)| section.trim_start_matches('\n'))
            .unwrap();
        assert!(section.chars().count() <= budget.total_chars);
        for line in section.lines() {
            let memory = line.strip_prefix("- ").unwrap();
            assert!(memory.chars().count() <= budget.per_memory_chars);
            assert!(memory.ends_with("..."));
        }
    }

    #[test]
    fn clip_counts_chars_not_bytes() {
        assert_eq!(clip("日記日記", 4), "日記日記");
        assert_eq!(clip("日記日記日記", 5), "日記...");
        assert_eq!(clip("abcdef", 2), "ab");
    }

    #[test]
    fn user_message_never_truncated() {
        let long = "x".repeat(20_000);
        let budget = PromptBudget {
            total_chars: 10,
            per_memory_chars: 5,
        };
        let prompt = create_prompt_with_memory(&long, &[], &budget);
        assert!(prompt.contains(&long));
    }
}
