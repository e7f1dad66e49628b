pub static DEFAULT_POLICY: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/default/policy.yml"));
