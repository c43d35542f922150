use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sparkfx::config::Config;
use sparkfx::format;
use sparkfx::pipeline::{self, Generation};

#[derive(Parser, Debug)]
#[command(
    name = "sparkfx",
    about = "Generate compile-checked JavaFX interface code from a description",
    version
)]
struct Args {
    /// What to build, in plain language (reads stdin when omitted)
    description: Option<String>,

    /// Check the configuration and exit
    #[arg(short, long)]
    check: bool,

    /// Write a placeholder config file to edit, then exit
    #[arg(long)]
    init: bool,

    /// Print the validated source as received, skipping the formatter
    #[arg(long)]
    raw: bool,

    /// Seconds to wait for the stream before accepting partial output
    #[arg(short, long, default_value_t = pipeline::DEFAULT_WAIT.as_secs())]
    timeout: u64,

    /// Write the generated source to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    if args.init {
        Config::default().save()?;
        eprintln!("Wrote a placeholder config; fill in your credentials.");
        return Ok(());
    }

    let config = Config::load();
    if args.check {
        let problems = config.validate();
        if problems.is_empty() {
            eprintln!("Configuration looks good.");
            return Ok(());
        }
        for problem in &problems {
            eprintln!("  {problem}");
        }
        anyhow::bail!("configuration is incomplete");
    }

    let description = match args.description {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim().to_string()
        }
    };
    if description.is_empty() {
        anyhow::bail!("nothing to generate: give a description as an argument or on stdin");
    }
    if let Some(problem) = config.validate().first() {
        anyhow::bail!("{problem} (run with --init to create a config file)");
    }

    eprintln!("Generating JavaFX code...");
    let wait = Duration::from_secs(args.timeout.max(1));

    let generation = match pipeline::generate(&config, &description, wait).await {
        Ok(generation) => generation,
        Err(err) => {
            eprintln!("{}", err.user_message());
            std::process::exit(1);
        }
    };

    if generation.partial {
        eprintln!("Warning: the stream was cut short; output may be incomplete.");
    }

    if generation.compiles {
        eprintln!("Compilation check passed.");
    } else {
        eprintln!("Compilation check failed; see the report.");
    }
    let text = render_output(&generation, &description, args.raw);

    match args.output {
        Some(path) => {
            std::fs::write(&path, format!("{text}\n"))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Assemble the text for the output target. Diagnostic reports go out exactly
/// as rendered; accepted code is normalized and stamped with the banner, or
/// passed through untouched under `--raw`.
fn render_output(generation: &Generation, description: &str, raw: bool) -> String {
    if !generation.compiles || raw {
        return generation.text.clone();
    }
    format!(
        "{}\n{}",
        banner(description),
        format::normalize(&generation.text)
    )
}

/// Comment header stamped onto successful output.
fn banner(description: &str) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M");
    format!("// {description}\n// generated {now}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "public class A {\n    int x;\n}";

    fn generation(compiles: bool) -> Generation {
        Generation {
            text: SOURCE.to_string(),
            compiles,
            partial: false,
        }
    }

    #[test]
    fn raw_output_is_the_validated_text_with_no_banner() {
        let out = render_output(&generation(true), "a form", true);
        assert_eq!(out, SOURCE);
    }

    #[test]
    fn normal_output_carries_the_banner_above_normalized_code() {
        let out = render_output(&generation(true), "a form", false);
        assert!(out.starts_with("// a form\n// generated "));
        assert!(out.contains(SOURCE));
    }

    #[test]
    fn failing_reports_pass_through_regardless_of_raw() {
        let report = Generation {
            text: "// compilation failed: x\n\nint".to_string(),
            compiles: false,
            partial: false,
        };
        assert_eq!(render_output(&report, "d", false), report.text);
        assert_eq!(render_output(&report, "d", true), report.text);
    }
}
