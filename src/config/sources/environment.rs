//! Environment source: `AGENTSPEC__PIPELINE__MAX_DEPTH=16` sets `pipeline.max_depth`.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const PREFIX: &str = "AGENTSPEC";
pub const SEPARATOR: &str = "__";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator(SEPARATOR)
            .separator(SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("export.tests"),
    )
}
