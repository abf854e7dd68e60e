use pg_chat_model::{ChatRequest, FunctionCallDirective, FunctionSpec, Message};
use serde::Serialize;

use crate::OpenAIConfig;

// ------------------------
// Types sent to the server
// ------------------------

/// The chat completion request body.
///
/// Optional fields are left out of the payload entirely instead of being
/// sent as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'a FunctionCallDirective>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request<'a>(
    req: &'a ChatRequest,
    config: &'a OpenAIConfig,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model: &config.model,
        messages: &req.messages,
        functions: (!req.functions.is_empty()).then_some(&req.functions[..]),
        function_call: req.function_call.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::OpenAIConfigBuilder;

    fn encode(req: &ChatRequest) -> Value {
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        serde_json::to_value(create_request(req, &config)).unwrap()
    }

    fn function(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_owned(),
            description: format!("Calls {name}."),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
        }
    }

    #[test]
    fn test_omits_absent_fields() {
        let req = ChatRequest {
            messages: vec![
                Message::system("You are a helpful assistant."),
                Message::user("Hello"),
            ],
            ..Default::default()
        };
        let payload = encode(&req);
        assert_eq!(
            payload,
            json!({
                "model": "custom",
                "messages": [
                    { "role": "system", "content": "You are a helpful assistant." },
                    { "role": "user", "content": "Hello" }
                ]
            })
        );
        let object = payload.as_object().unwrap();
        assert!(!object.contains_key("functions"));
        assert!(!object.contains_key("function_call"));
    }

    #[test]
    fn test_functions_keep_order() {
        let functions = vec![
            function("ask_postgres_database"),
            function("describe_table"),
            function("list_tables"),
        ];
        let req = ChatRequest {
            messages: vec![Message::user("How many users?")],
            functions: functions.clone(),
            function_call: None,
        };
        let payload = encode(&req);
        assert_eq!(payload["functions"], serde_json::to_value(&functions).unwrap());
        assert!(!payload.as_object().unwrap().contains_key("function_call"));
    }

    #[test]
    fn test_function_call_directive() {
        let req = ChatRequest {
            messages: vec![Message::user("How many users?")],
            functions: vec![function("ask_postgres_database")],
            function_call: Some(FunctionCallDirective::named(
                "ask_postgres_database",
            )),
        };
        let payload = encode(&req);
        assert_eq!(
            payload["function_call"],
            json!({ "name": "ask_postgres_database" })
        );

        // A directive alone is still sent.
        let req = ChatRequest {
            messages: vec![Message::user("Hi")],
            functions: vec![],
            function_call: Some(FunctionCallDirective::none()),
        };
        let payload = encode(&req);
        assert_eq!(payload["function_call"], json!("none"));
        assert!(!payload.as_object().unwrap().contains_key("functions"));
    }
}
