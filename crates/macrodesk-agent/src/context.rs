// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly: one chronological transcript per customer, spanning all
//! channels, with each turn tagged by its channel.
//!
//! No truncation happens here; bounding the history is the engine's call
//! (it passes a pre-limited slice).

use macrodesk_core::types::{Channel, Customer, Direction, Message};

/// Renders messages as a tagged transcript:
///
/// ```text
/// Customer [SMS]: where's my order?
/// Agent [EMAIL]: It shipped yesterday.
/// ```
pub fn format_transcript(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(No previous messages)".to_string();
    }
    let mut lines = Vec::with_capacity(messages.len());
    for message in messages {
        let channel = message.channel.to_string().to_uppercase();
        let speaker = match message.direction {
            Direction::Inbound => "Customer",
            Direction::Outbound => "Agent",
        };
        lines.push(format!("{speaker} [{channel}]: {}", message.content));
    }
    lines.join("\n")
}

/// Renders what is known about the customer: profile columns plus the
/// accumulated `extracted_data` facts.
pub fn format_customer_profile(customer: &Customer) -> String {
    let mut lines = Vec::new();
    if let Some(ref name) = customer.first_name {
        match customer.last_name {
            Some(ref last) => lines.push(format!("Name: {name} {last}")),
            None => lines.push(format!("Name: {name}")),
        }
    }
    if let Some(ref company) = customer.company_name {
        lines.push(format!("Company: {company}"));
    }
    if let Some(ref tier) = customer.account_tier {
        lines.push(format!("Account tier: {tier}"));
    }
    for (key, value) in &customer.extracted_data {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{key}: {rendered}"));
    }

    if lines.is_empty() {
        "(No information collected yet)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Builds the user-turn prompt for one batch.
///
/// When the batch arrives on a channel the customer has never used before
/// and older messages exist on other channels, that history is rendered
/// under an explicit label so the model's reply reflects continuity.
pub fn build_prompt(customer: &Customer, history: &[Message], batch: &[Message]) -> String {
    let batch_channel = batch.last().map(|m| m.channel);
    let batch_ids: Vec<&str> = batch.iter().map(|m| m.id.as_str()).collect();
    let prior: Vec<Message> = history
        .iter()
        .filter(|m| !batch_ids.contains(&m.id.as_str()))
        .cloned()
        .collect();

    let channel_is_new = batch_channel
        .is_some_and(|channel| !prior.iter().any(|m| m.channel == channel));

    let conversation = if channel_is_new && !prior.is_empty() {
        format!(
            "PREVIOUS CONVERSATION FROM OTHER CHANNELS:\n{}\n\nCURRENT CONVERSATION:\n{}",
            format_transcript(&prior),
            format_transcript(batch)
        )
    } else {
        format!("CONVERSATION HISTORY:\n{}", format_transcript(history))
    };

    format!(
        "Continue this conversation with the customer.\n\n{conversation}\n\n\
         WHAT WE KNOW ABOUT THE CUSTOMER:\n{}\n\n\
         Respond appropriately for the channel. You have tools available if needed. \
         Use lookup_order when an order number is mentioned and save_customer_info \
         when the customer shares new information.",
        format_customer_profile(customer)
    )
}

/// Read-only context snapshot for a voice session: the full cross-channel
/// transcript at connection time. Empty string when there is no history.
pub fn voice_context_snapshot(messages: &[Message]) -> String {
    if messages.is_empty() {
        String::new()
    } else {
        format_transcript(messages)
    }
}

/// The channel of the most recent inbound message, used as the default
/// outbound channel when the model does not pick one.
pub fn last_inbound_channel(messages: &[Message]) -> Option<Channel> {
    messages
        .iter()
        .rev()
        .find(|m| m.direction == Direction::Inbound)
        .map(|m| m.channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrodesk_core::types::now_iso;

    fn msg(id: &str, direction: Direction, channel: Channel, content: &str) -> Message {
        Message {
            id: id.to_string(),
            customer_id: "c1".to_string(),
            direction,
            channel,
            content: content.to_string(),
            batch_id: None,
            metadata: None,
            created_at: now_iso(),
        }
    }

    fn customer() -> Customer {
        Customer {
            id: "c1".to_string(),
            phone_number: None,
            email: None,
            first_name: None,
            last_name: None,
            company_name: None,
            account_tier: None,
            extracted_data: serde_json::Map::new(),
            created_at: now_iso(),
            updated_at: now_iso(),
        }
    }

    #[test]
    fn transcript_tags_speaker_and_channel() {
        let messages = vec![
            msg("m1", Direction::Inbound, Channel::Email, "where is ORD-1001?"),
            msg("m2", Direction::Outbound, Channel::Email, "It was delivered."),
            msg("m3", Direction::Inbound, Channel::Sms, "refund on that"),
        ];
        let transcript = format_transcript(&messages);
        assert!(transcript.contains("Customer [EMAIL]: where is ORD-1001?"));
        assert!(transcript.contains("Agent [EMAIL]: It was delivered."));
        assert!(transcript.contains("Customer [SMS]: refund on that"));
    }

    #[test]
    fn empty_transcript_placeholder() {
        assert_eq!(format_transcript(&[]), "(No previous messages)");
    }

    #[test]
    fn profile_renders_columns_and_extracted_data() {
        let mut c = customer();
        c.first_name = Some("Kal".into());
        c.extracted_data
            .insert("order_number".into(), serde_json::json!("ORD-1001"));
        let profile = format_customer_profile(&c);
        assert!(profile.contains("Name: Kal"));
        assert!(profile.contains("order_number: ORD-1001"));
    }

    #[test]
    fn empty_profile_placeholder() {
        assert_eq!(
            format_customer_profile(&customer()),
            "(No information collected yet)"
        );
    }

    #[test]
    fn first_use_of_channel_gets_labeled_prior_section() {
        let email_in = msg("m1", Direction::Inbound, Channel::Email, "order status?");
        let email_out = msg("m2", Direction::Outbound, Channel::Email, "Delivered.");
        let sms_in = msg("m3", Direction::Inbound, Channel::Sms, "refund on that");

        let history = vec![email_in.clone(), email_out.clone(), sms_in.clone()];
        let prompt = build_prompt(&customer(), &history, &[sms_in]);
        assert!(prompt.contains("PREVIOUS CONVERSATION FROM OTHER CHANNELS:"));
        assert!(prompt.contains("Customer [EMAIL]: order status?"));
        assert!(prompt.contains("CURRENT CONVERSATION:"));
    }

    #[test]
    fn returning_channel_uses_plain_history() {
        let sms_old = msg("m1", Direction::Inbound, Channel::Sms, "hi");
        let sms_reply = msg("m2", Direction::Outbound, Channel::Sms, "hello");
        let sms_new = msg("m3", Direction::Inbound, Channel::Sms, "order status?");

        let history = vec![sms_old, sms_reply, sms_new.clone()];
        let prompt = build_prompt(&customer(), &history, &[sms_new]);
        assert!(prompt.contains("CONVERSATION HISTORY:"));
        assert!(!prompt.contains("PREVIOUS CONVERSATION FROM OTHER CHANNELS:"));
    }

    #[test]
    fn brand_new_customer_has_no_prior_section() {
        let first = msg("m1", Direction::Inbound, Channel::Sms, "hi");
        let prompt = build_prompt(&customer(), std::slice::from_ref(&first), &[first.clone()]);
        assert!(prompt.contains("CONVERSATION HISTORY:"));
    }

    #[test]
    fn last_inbound_channel_skips_outbound() {
        let messages = vec![
            msg("m1", Direction::Inbound, Channel::Email, "a"),
            msg("m2", Direction::Outbound, Channel::Sms, "b"),
        ];
        assert_eq!(last_inbound_channel(&messages), Some(Channel::Email));
        assert_eq!(last_inbound_channel(&[]), None);
    }
}
