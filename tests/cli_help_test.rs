#[cfg(test)]
mod cli_help_tests {
    use assert_cmd::prelude::*;
    use std::process::Command;

    #[test]
    fn test_cli_help_output() {
        let mut cmd = Command::cargo_bin("terminus").unwrap();

        let assert_result = cmd.arg("--help").assert().success();
        let output = assert_result.get_output();
        let help_output = String::from_utf8_lossy(&output.stdout);

        assert!(help_output.contains("Usage:"));
        assert!(help_output.contains("Options:"));
        assert!(help_output.contains("Commands:"));

        assert!(help_output.contains("auth"));
        assert!(help_output.contains("site"));
        assert!(help_output.contains("env"));

        assert!(help_output.contains("-h, --help"));
        assert!(help_output.contains("-V, --version"));
        assert!(help_output.contains("terminus"));
    }

    #[test]
    fn test_cli_subcommand_help_outputs() {
        let subcommands = vec![
            ("auth", vec!["login", "logout", "whoami"]),
            ("site", vec!["list"]),
            ("env", vec!["list"]),
        ];

        for (subcommand, expected) in subcommands {
            let mut cmd = Command::cargo_bin("terminus").unwrap();
            let assert_result = cmd.arg(subcommand).arg("--help").assert().success();
            let output = assert_result.get_output();
            let help_output = String::from_utf8_lossy(&output.stdout);

            assert!(help_output.contains("Usage:"));
            assert!(help_output.contains(subcommand));
            for name in expected {
                assert!(
                    help_output.contains(name),
                    "help for {} should mention {}",
                    subcommand,
                    name
                );
            }
        }
    }

    #[test]
    fn test_login_help_lists_options() {
        let mut cmd = Command::cargo_bin("terminus").unwrap();
        let assert_result = cmd.args(["auth", "login", "--help"]).assert().success();
        let help_output = String::from_utf8_lossy(&assert_result.get_output().stdout).to_string();

        assert!(help_output.contains("--machine-token"));
        assert!(help_output.contains("--email"));
    }
}
