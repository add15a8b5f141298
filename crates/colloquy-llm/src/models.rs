/// A model the client can be pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "claude-3-7-sonnet-20250219",
        name: "Claude 3.7 Sonnet",
        description: "Most capable model, ideal for complex tasks",
    },
    ModelInfo {
        id: "claude-3-5-sonnet-20240620",
        name: "Claude 3.5 Sonnet",
        description: "Excellent balance of intelligence and speed",
    },
    ModelInfo {
        id: "claude-3-opus-20240229",
        name: "Claude 3 Opus",
        description: "Legacy model with proven reliability",
    },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}
