//! Contract-level queries for the CLI: hex lists, decoded maps, ABI summary.

use crate::batch::BatchDecoder;
use crate::parser::BytecodeParser;
use crate::signature::SignatureSet;
use std::collections::BTreeMap;

pub struct BytecodeService {
    batch: BatchDecoder,
}

impl BytecodeService {
    pub fn new(batch: BatchDecoder) -> Self {
        Self { batch }
    }

    /// Verified `selector → text` pairs, sorted by selector.
    pub async fn decoded_function_signs(
        &self,
        parser: &dyn BytecodeParser,
    ) -> BTreeMap<String, String> {
        self.decode(parser.function_signatures()).await
    }

    /// Verified `topic → text` pairs, sorted by topic.
    pub async fn decoded_event_signs(&self, parser: &dyn BytecodeParser) -> BTreeMap<String, String> {
        self.decode(parser.event_signatures()).await
    }

    async fn decode(&self, set: SignatureSet) -> BTreeMap<String, String> {
        let kind = set.kind();
        self.batch.resolve_all(kind, set).await.into_iter().collect()
    }

    /// Every extracted hash, with its text signature where one was verified.
    pub async fn abi(&self, parser: &dyn BytecodeParser) -> serde_json::Value {
        let functions = parser.function_signatures();
        let events = parser.event_signatures();
        let function_names = self.decode(functions.clone()).await;
        let event_names = self.decode(events.clone()).await;
        make_abi(&functions, &function_names, &events, &event_names)
    }
}

/// Build a minimal ABI-like summary from extracted hashes and resolved names.
pub fn make_abi(
    functions: &SignatureSet,
    function_names: &BTreeMap<String, String>,
    events: &SignatureSet,
    event_names: &BTreeMap<String, String>,
) -> serde_json::Value {
    let entries = |set: &SignatureSet, names: &BTreeMap<String, String>, key: &str| {
        set.iter()
            .map(|hex| {
                let mut entry = serde_json::Map::new();
                entry.insert(key.to_string(), serde_json::json!(hex));
                entry.insert("signature".to_string(), serde_json::json!(names.get(hex)));
                serde_json::Value::Object(entry)
            })
            .collect::<Vec<_>>()
    };

    serde_json::json!({
        "functions": entries(functions, function_names, "selector"),
        "events": entries(events, event_names, "topic"),
    })
}
