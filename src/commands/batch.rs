//! Parallel execution of a JSON-lines request file

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use std::io::{self, BufWriter, Write};

use reconcile::batch::{self, BatchOptions, BatchSummary, Outcome};
use reconcile::{CallContext, Envelope};

use crate::Context;
use crate::cli::BatchArgs;
use crate::config::Settings;

pub fn run(ctx: &Context, args: &BatchArgs) -> Result<()> {
    let document = super::read_input(Some(&args.file))?;
    let requests = parse_lines(&document)?;

    let needs_token = requests
        .iter()
        .any(|envelope| envelope.request.operation().is_remote());
    let settings = Settings::resolve(&ctx.service)?;
    let registry = super::connect(&settings, needs_token)?;

    let opts = args
        .jobs
        .map_or_else(BatchOptions::default, |jobs| BatchOptions { jobs });
    // Every remote call is still bounded by the client timeout
    let call = CallContext::new();
    let outcomes = batch::execute(&registry, &call, requests, &opts)?;

    write_outcomes(&mut BufWriter::new(io::stdout().lock()), &outcomes)?;

    let summary = BatchSummary::from_outcomes(&outcomes);
    if !ctx.quiet {
        eprintln!(
            "{} {} succeeded, {} failed",
            if summary.is_success() {
                "✓".green()
            } else {
                "✗".red()
            },
            summary.succeeded,
            summary.failed
        );
    }
    if !summary.is_success() {
        bail!("{} of {} requests failed", summary.failed, summary.total());
    }
    Ok(())
}

/// One request per non-blank line; each line names its own `op`
fn parse_lines(document: &str) -> Result<Vec<Envelope>> {
    document
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid request on line {}", n + 1))
        })
        .collect()
}

fn write_outcomes(out: &mut impl Write, outcomes: &[Outcome]) -> Result<()> {
    for outcome in outcomes {
        serde_json::to_writer(&mut *out, outcome)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudapi::transport::Method;
    use cloudapi::{Client, MockTransport};
    use reconcile::Operation;
    use serde_json::json;
    use std::sync::Arc;

    const REQUESTS: &str = r#"
{"op": "check", "type": "pulumiservice:index:AgentPool", "news": {"organizationName": "acme", "name": "runners"}}

{"op": "delete", "type": "pulumiservice:index:AccessToken", "id": "t-1"}
{"op": "update", "type": "pulumiservice:index:AccessToken", "id": "t-1"}
"#;

    #[test]
    fn test_parse_lines_skips_blank_lines() {
        let requests = parse_lines(REQUESTS).unwrap();
        let ops: Vec<_> = requests.iter().map(|r| r.request.operation()).collect();
        assert_eq!(
            ops,
            vec![Operation::Check, Operation::Delete, Operation::Update]
        );
    }

    #[test]
    fn test_parse_lines_reports_line_number() {
        let err = parse_lines("{\"op\": \"check\"}\n{oops}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_outcomes_in_request_order() {
        let mock = MockTransport::new();
        mock.route(Method::Delete, "user/tokens/t-1", 204, serde_json::Value::Null);
        let registry = crate::resources::registry(&Arc::new(Client::new(mock)));

        let outcomes = batch::execute(
            &registry,
            &CallContext::new(),
            parse_lines(REQUESTS).unwrap(),
            &BatchOptions { jobs: 2 },
        )
        .unwrap();

        let mut out = Vec::new();
        write_outcomes(&mut out, &outcomes).unwrap();
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["op"], json!("check"));
        assert_eq!(lines[1], json!({"op": "delete"}));
        assert_eq!(lines[2]["category"], json!("Illegal operation"));
        assert!(lines[2]["error"].as_str().unwrap().contains("expected create"));

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.failed, 1);
    }
}
