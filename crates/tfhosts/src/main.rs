//! tfhosts
//!
//! Builds an Ansible inventory from Terraform outputs: fetch `terraform output -json`,
//! resolve hosts and jump-host routing from the configured roles, write the inventory file.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tfhosts_core::outputs::single_line;
use tfhosts_core::{InventoryFormat, OutputReader, build_inventory, render, write_inventory};
use tfhosts_exec::LocalExecutor;
use tracing::info;

mod config;
mod logging;

use config::Config;

/// Generate an Ansible inventory from provisioning outputs
#[derive(Parser, Debug)]
#[command(name = "tfhosts", version, about)]
struct Args {
    /// Configuration file (defaults to ./tfhosts.toml, then the user config dir)
    #[arg(short, long, env = "TFHOSTS_CONFIG")]
    config: Option<PathBuf>,

    /// Inventory file to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Inventory format (yaml or json)
    #[arg(short, long)]
    format: Option<InventoryFormat>,

    /// Print the inventory instead of writing the file
    #[arg(long)]
    stdout: bool,

    /// Directory to run the provisioning tool in
    #[arg(short = 'C', long)]
    working_dir: Option<PathBuf>,

    /// Seconds to wait for the provisioning tool
    #[arg(long)]
    timeout: Option<u64>,

    /// Verify SSH host keys instead of disabling the check
    #[arg(long)]
    strict_host_key_checking: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.inventory.output = output.clone();
        }
        if let Some(format) = self.format {
            config.inventory.format = format;
        }
        if let Some(dir) = &self.working_dir {
            config.provisioner.working_dir = Some(dir.clone());
        }
        if let Some(timeout) = self.timeout {
            config.provisioner.timeout_secs = timeout;
        }
        if self.strict_host_key_checking {
            config.inventory.strict_host_key_checking = true;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose, args.log_json);

    ExitCode::from(exit_status(run(&args).await, &mut std::io::stderr()))
}

/// Exit status for a run, writing the failure diagnostic to `stderr`
fn exit_status(result: Result<()>, stderr: &mut impl Write) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            let _ = writeln!(stderr, "{}", diagnostic(&err));
            1
        }
    }
}

/// One-line `error: ...` message covering the whole error chain
fn diagnostic(err: &color_eyre::Report) -> String {
    format!("error: {}", single_line(&format!("{err:#}")))
}

async fn run(args: &Args) -> Result<()> {
    let mut config = Config::load_default(args.config.as_deref())?;
    args.apply(&mut config);

    let spec = config.role_spec();
    let options = config.render_options();

    let reader = OutputReader::new(
        Arc::new(LocalExecutor::new()),
        config.provisioner.command_spec(),
    )
    .with_timeout(config.provisioner.timeout());

    let outputs = reader.fetch_outputs().await?;
    let document = build_inventory(&outputs, &spec)?;

    if args.stdout {
        print!("{}", render(&document, config.inventory.format, options)?);
        return Ok(());
    }

    let path = &config.inventory.output;
    write_inventory(&document, path, config.inventory.format, options)?;
    info!(path = %path.display(), format = %config.inventory.format, "done");
    println!("Inventory written to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const SCENARIO: &str = r#"{"nat_host_public_ip": {"value": "3.3.3.3"}, "database_private_ip": {"value": "10.0.1.5"}, "docker_host_public_ip": {"value": "3.3.3.4"}}"#;

    /// Config whose provisioner prints `export` and whose inventory lands in `dir`
    fn write_config(dir: &Path, export: &str) -> PathBuf {
        std::fs::write(dir.join("export.json"), export).unwrap();
        let config = format!(
            r#"
                [provisioner]
                command = "cat"
                args = ["export.json"]
                working_dir = "{dir}"
                timeout_secs = 10

                [inventory]
                output = "{dir}/inventory.yml"
            "#,
            dir = dir.display()
        );
        let path = dir.join("tfhosts.toml");
        std::fs::write(&path, config).unwrap();
        path
    }

    fn args_for(config: &Path, extra: &[&str]) -> Args {
        let mut argv = vec!["tfhosts", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_run_writes_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), SCENARIO);

        run(&args_for(&config, &[])).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("inventory.yml")).unwrap();
        assert!(content.contains("database_host"));
        assert!(content.contains("ProxyCommand"));
    }

    #[tokio::test]
    async fn test_malformed_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), r#"{"nat_host_public_ip": {"value": "3.3"#);

        let err = run(&args_for(&config, &[])).await.unwrap_err();

        assert!(err.to_string().contains("malformed provisioning output"));
        assert!(!dir.path().join("inventory.yml").exists());
    }

    #[tokio::test]
    async fn test_missing_output_names_role_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(
            dir.path(),
            r#"{"nat_host_public_ip": {"value": "3.3.3.3"}, "docker_host_public_ip": {"value": "3.3.3.4"}}"#,
        );

        let err = run(&args_for(&config, &[])).await.unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "missing output `database_private_ip` required by role `database`"
        );
        assert!(!dir.path().join("inventory.yml").exists());
    }

    #[tokio::test]
    async fn test_cli_overrides_output_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), SCENARIO);
        let output = dir.path().join("hosts.json");

        run(&args_for(
            &config,
            &["--output", output.to_str().unwrap(), "--format", "json"],
        ))
        .await
        .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.trim_start().starts_with('{'));
        assert!(!dir.path().join("inventory.yml").exists());
    }

    #[tokio::test]
    async fn test_multiline_tool_error_is_one_diagnostic_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.provisioner.command = "sh".to_string();
        config.provisioner.args = vec![
            "-c".to_string(),
            "printf '╷\\n│ Error: No outputs found\\n╵\\n' >&2; exit 1"
                .to_string(),
        ];
        config.inventory.output = dir.path().join("inventory.yml");
        let path = dir.path().join("tfhosts.toml");
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let result = run(&args_for(&path, &[])).await;
        let mut stderr = Vec::new();
        let status = exit_status(result, &mut stderr);

        let text = String::from_utf8(stderr).unwrap();
        assert_eq!(status, 1);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("error: provisioning tool unavailable"));
        assert!(text.contains("Error: No outputs found"));
        assert!(!dir.path().join("inventory.yml").exists());
    }

    #[test]
    fn test_exit_status_mapping() {
        let mut stderr = Vec::new();
        assert_eq!(exit_status(Ok(()), &mut stderr), 0);
        assert!(stderr.is_empty());

        let err = eyre::eyre!("line one\nline two").wrap_err("failed to parse config tfhosts.toml");
        assert_eq!(exit_status(Err(err), &mut stderr), 1);
        assert_eq!(
            String::from_utf8(stderr).unwrap(),
            "error: failed to parse config tfhosts.toml: line one; line two\n"
        );
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::try_parse_from([
            "tfhosts",
            "-C",
            "infra/dev",
            "--timeout",
            "5",
            "--strict-host-key-checking",
        ])
        .unwrap();
        let mut config = Config::default();

        args.apply(&mut config);

        assert_eq!(
            config.provisioner.working_dir,
            Some(PathBuf::from("infra/dev"))
        );
        assert_eq!(config.provisioner.timeout_secs, 5);
        assert!(config.inventory.strict_host_key_checking);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(logging::level_for(0), "error");
        assert_eq!(logging::level_for(2), "debug");
        assert_eq!(logging::level_for(9), "trace");
    }
}
