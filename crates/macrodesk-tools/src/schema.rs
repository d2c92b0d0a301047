// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool definitions and argument validation.
//!
//! Tools form a fixed registry keyed by name: the model names a tool by
//! string and supplies an open argument map, so arguments are validated
//! against the declared JSON Schema before anything touches storage.
//! Unknown tool names are rejected with a structured error result, never
//! dispatched.

use macrodesk_core::types::ToolSchema;
use serde_json::json;

/// The eight tools available on the text channels (email, SMS).
pub fn text_channel_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "save_customer_info".to_string(),
            description: "Save information learned about the customer to their profile. \
                          Call this when the customer shares their name, company, or \
                          details about their issue."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "first_name": {"type": "string", "description": "Customer's first name"},
                    "last_name": {"type": "string", "description": "Customer's last name"},
                    "company_name": {"type": "string", "description": "Customer's company or store name"},
                    "issue_type": {
                        "type": "string",
                        "description": "Type of issue: 'order', 'refund', 'inventory', 'shipping', 'dispute', 'other'"
                    },
                    "order_number": {
                        "type": "string",
                        "description": "Order number being discussed (e.g., 'ORD-1001')"
                    },
                    "severity": {
                        "type": "string",
                        "description": "Issue severity: 'low', 'medium', 'high', 'urgent'"
                    }
                }
            }),
        },
        ToolSchema {
            name: "lookup_order".to_string(),
            description: "Look up order details by order number. Use this when a customer \
                          asks about a specific order, wants to check status, or needs \
                          tracking info."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_number": {
                        "type": "string",
                        "description": "The order number (e.g., 'ORD-1001' or just '1001')"
                    }
                },
                "required": ["order_number"]
            }),
        },
        ToolSchema {
            name: "check_inventory".to_string(),
            description: "Check stock levels for a product by SKU or product name. Use \
                          this when a customer asks about availability."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sku": {"type": "string", "description": "Product SKU (e.g., 'GPU-RTX4090')"},
                    "product_name": {
                        "type": "string",
                        "description": "Product name to search for if the SKU is unknown"
                    }
                }
            }),
        },
        ToolSchema {
            name: "process_refund".to_string(),
            description: "Process a refund for an order. Refunds over the approval limit \
                          are escalated to a human automatically."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_number": {"type": "string", "description": "The order number to refund"},
                    "reason": {
                        "type": "string",
                        "description": "Reason for refund: 'customer_request', 'item_not_received', 'item_damaged', 'wrong_item', 'courtesy'"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Partial refund amount in dollars (omit for a full refund)"
                    }
                },
                "required": ["order_number", "reason"]
            }),
        },
        ToolSchema {
            name: "update_order_status".to_string(),
            description: "Update the status of an order. Use this to mark orders as \
                          shipped, add tracking, or cancel orders."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_number": {"type": "string", "description": "The order number to update"},
                    "status": {
                        "type": "string",
                        "description": "New status: 'processing', 'shipped', 'delivered', 'cancelled'"
                    },
                    "tracking_number": {
                        "type": "string",
                        "description": "Tracking number (required when marking as shipped)"
                    },
                    "carrier": {
                        "type": "string",
                        "description": "Shipping carrier: 'UPS', 'USPS', 'FedEx', 'DHL'"
                    }
                },
                "required": ["order_number", "status"]
            }),
        },
        ToolSchema {
            name: "create_return_label".to_string(),
            description: "Generate a return shipping label for a shipped or delivered \
                          order. Use this when processing a return."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_number": {"type": "string", "description": "The order number for the return"}
                },
                "required": ["order_number"]
            }),
        },
        ToolSchema {
            name: "search_knowledge_base".to_string(),
            description: "Search help articles about policies, procedures, or \
                          compatibility. Use for questions about shipping, returns, \
                          payments, or PC part compatibility."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g., 'return policy', 'PSU requirements')"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional category filter: 'shipping', 'returns', 'payments', 'compatibility'"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolSchema {
            name: "escalate_to_human".to_string(),
            description: "Escalate to human support. Use for: fraud concerns, large \
                          refunds, angry customers, complex disputes, or explicit \
                          requests for a human."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Reason for escalation"},
                    "priority": {
                        "type": "string",
                        "description": "Priority: 'normal', 'high', 'urgent'"
                    },
                    "summary": {
                        "type": "string",
                        "description": "Brief summary for the human agent"
                    }
                },
                "required": ["reason"]
            }),
        },
    ]
}

/// The voice-session tool set: the text tools plus `send_followup`, which
/// writes an outbound message on another channel mid-call.
pub fn voice_tools() -> Vec<ToolSchema> {
    let mut tools = text_channel_tools();
    tools.push(ToolSchema {
        name: "send_followup".to_string(),
        description: "Send a follow-up message to the customer on email or SMS. Use \
                      this when they need written confirmation or details to reference \
                      after the call."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "channel": {
                    "type": "string",
                    "enum": ["email", "sms"],
                    "description": "Channel to send on: 'email' or 'sms'"
                },
                "message": {"type": "string", "description": "The message content to send"}
            },
            "required": ["channel", "message"]
        }),
    });
    tools
}

/// Validates an argument object against a tool's JSON Schema.
///
/// Checks that `args` is an object, that every `required` property is
/// present, and that provided values match the declared primitive type.
/// Properties not named in the schema are tolerated (the model sometimes
/// volunteers extras); the executor decides what to do with them.
pub fn validate_args(schema: &serde_json::Value, args: &serde_json::Value) -> Result<(), String> {
    let Some(args_map) = args.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for requirement in required {
            let Some(name) = requirement.as_str() else { continue };
            let present = args_map
                .get(name)
                .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
            if !present {
                return Err(format!("missing required argument: {name}"));
            }
        }
    }

    let properties = schema.get("properties").and_then(|p| p.as_object());
    if let Some(properties) = properties {
        for (name, value) in args_map {
            let Some(declared) = properties.get(name) else { continue };
            let Some(expected) = declared.get("type").and_then(|t| t.as_str()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let ok = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                _ => true,
            };
            if !ok {
                return Err(format!("argument {name} must be of type {expected}"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_registry_has_eight_tools() {
        let tools = text_channel_tools();
        assert_eq!(tools.len(), 8);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        for expected in [
            "save_customer_info",
            "lookup_order",
            "check_inventory",
            "process_refund",
            "update_order_status",
            "create_return_label",
            "search_knowledge_base",
            "escalate_to_human",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn voice_registry_adds_send_followup() {
        let tools = voice_tools();
        assert_eq!(tools.len(), 9);
        assert!(tools.iter().any(|t| t.name == "send_followup"));
    }

    #[test]
    fn validate_rejects_missing_required_argument() {
        let schema = &text_channel_tools()
            .into_iter()
            .find(|t| t.name == "lookup_order")
            .unwrap()
            .parameters;
        let err = validate_args(schema, &json!({})).unwrap_err();
        assert!(err.contains("order_number"));
    }

    #[test]
    fn validate_rejects_empty_string_for_required_argument() {
        let schema = &text_channel_tools()
            .into_iter()
            .find(|t| t.name == "lookup_order")
            .unwrap()
            .parameters;
        assert!(validate_args(schema, &json!({"order_number": ""})).is_err());
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let schema = &text_channel_tools()
            .into_iter()
            .find(|t| t.name == "process_refund")
            .unwrap()
            .parameters;
        let err = validate_args(
            schema,
            &json!({"order_number": "ORD-1001", "reason": "courtesy", "amount": "fifty"}),
        )
        .unwrap_err();
        assert!(err.contains("amount"));
    }

    #[test]
    fn validate_tolerates_undeclared_properties() {
        let schema = &text_channel_tools()
            .into_iter()
            .find(|t| t.name == "lookup_order")
            .unwrap()
            .parameters;
        assert!(
            validate_args(schema, &json!({"order_number": "ORD-1001", "extra": "x"})).is_ok()
        );
    }

    #[test]
    fn validate_rejects_non_object_arguments() {
        let schema = &text_channel_tools()[0].parameters;
        assert!(validate_args(schema, &json!("not an object")).is_err());
    }
}
