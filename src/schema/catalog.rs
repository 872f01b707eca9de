//! Schema documents compiled into the binary.

/// `(version, document)` pairs for every published schema, oldest first.
pub const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    (
        "0.2.0",
        include_str!("../../schemas/agentspec-0.2.0.schema.json"),
    ),
    (
        "0.3.0",
        include_str!("../../schemas/agentspec-0.3.0.schema.json"),
    ),
    (
        "0.4.0",
        include_str!("../../schemas/agentspec-0.4.0.schema.json"),
    ),
];
