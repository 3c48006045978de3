use std::path::PathBuf;

use jvcodegen::{
    config::{LoweringConfig, MembershipCheck},
    error::CodegenError,
    lowering::InstanceOfLowering,
};

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("jvcodegen-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_lowering_table_from_file() {
    let path = write_config(
        "full",
        r#"
[lowering]
membership_check = "never"
verify_stack_effect = true

[unrelated]
key = "ignored"
"#,
    );
    let config = LoweringConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.membership_check, MembershipCheck::Never);
    assert!(config.verify_stack_effect);
    assert!(!config.checks_membership());

    let lowering = InstanceOfLowering::new(config.clone());
    assert_eq!(lowering.config(), &config);
}

#[test]
fn partial_table_keeps_defaults() {
    let config =
        LoweringConfig::from_toml_str("[lowering]\nverify_stack_effect = true\n", "inline").unwrap();
    assert_eq!(config.membership_check, MembershipCheck::Debug);
    assert_eq!(config.checks_membership(), cfg!(debug_assertions));
}

#[test]
fn invalid_values_name_the_file() {
    let path = write_config("invalid", "[lowering]\nmembership_check = \"sometimes\"\n");
    let err = LoweringConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    match &err {
        CodegenError::ConfigParseError { file, .. } => {
            assert_eq!(file, &path.display().to_string());
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("Failed to parse configuration file"));
}
