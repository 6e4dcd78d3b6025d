//! CLI: schema documents → (python | typescript), plus payload marshalling.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crate::codegen::{Failure, PythonCodegen, TypeScriptCodegen};
use crate::config::GeneratorConfig;
use crate::format::{CommandFormatter, SourceFormatter, Unformatted};
use crate::lower::{Bundle, parse_document};
use crate::marshal::{self, Marshaller};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate slotted value objects and structural interfaces from schema documents
#[derive(Parser, Debug)]
#[command(name = "contract-codegen")]
pub struct CommandLineInterface {
    /// more logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit Python value-object classes
    Python(PythonOut),
    /// emit TypeScript interfaces and action bindings
    Typescript(TypeScriptOut),
    /// decode JSON payloads against a contract and print them re-encoded
    Marshal(MarshalRun),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more schema documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct OutputSettings {
    /// JSON generator config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// pipe the generated text through this command (e.g. "black -q -")
    #[arg(long)]
    format_cmd: Option<String>,

    /// skip contracts that fail to render instead of aborting
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PythonOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    output_settings: OutputSettings,

    /// dotted path of the base class, e.g. app.slots.Slot
    #[arg(long)]
    base_class: Option<String>,

    /// omit the shared import block
    #[arg(long, default_value_t = false)]
    no_imports: bool,
}

#[derive(clap::Parser, Debug)]
struct TypeScriptOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    output_settings: OutputSettings,

    /// omit the runtime helper import
    #[arg(long, default_value_t = false)]
    no_runtime_import: bool,

    /// module the action bindings import their runtime helper from
    #[arg(long)]
    runtime_module: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct MarshalRun {
    #[command(flatten)]
    input_settings: InputSettings,

    /// contract to decode into
    #[arg(long)]
    contract: String,

    /// payload files (paths or glob patterns)
    #[arg(long, num_args = 1.., required = true)]
    data: Vec<String>,

    /// jq filter selecting the payload(s) inside each data file
    #[arg(long)]
    jq_expr: Option<String>,

    /// decode without the required-field check
    #[arg(long, default_value_t = false)]
    no_validate: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_bundle(&self) -> Result<Bundle> {
        let mut bundle = Bundle::default();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read schema document {}", source_path.display()))?;
            let doc = parse_document(&source)
                .with_context(|| format!("failed to parse schema document {}", source_path.display()))?;
            bundle
                .absorb(&doc)
                .with_context(|| format!("failed to lower schema document {}", source_path.display()))?;
        }
        if bundle.contracts.is_empty() && bundle.enums.is_empty() {
            bail!("no schemas found in {:?}", self.input);
        }
        Ok(bundle)
    }
}

impl OutputSettings {
    fn load_config(&self) -> Result<GeneratorConfig> {
        let Some(path) = self.config.as_ref() else {
            return Ok(GeneratorConfig::default());
        };
        let src = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        GeneratorConfig::from_json_str(&src).with_context(|| format!("invalid config {}", path.display()))
    }

    fn finish(&self, generated: String, failures: Vec<Failure>) -> Result<()> {
        for failure in &failures {
            warn!(contract = failure.contract.as_str(), error = %failure.error, "contract skipped");
        }
        let formatted = match self.format_cmd.as_deref().and_then(CommandFormatter::parse) {
            Some(formatter) => formatter.format(&generated),
            None => Unformatted.format(&generated),
        };
        let text = match formatted {
            Ok(text) => text,
            Err(error) => {
                eprintln!("{}\n{}", "unformatted source:".yellow(), error.raw());
                return Err(error.into());
            }
        };
        write_output(self.out.as_deref(), &text)?;
        if !failures.is_empty() {
            bail!("{} contract(s) failed to render", failures.len());
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Python(target) => {
                let bundle = target.input_settings.load_bundle()?;
                let mut options = target.output_settings.load_config()?.python;
                if let Some(base) = target.base_class.as_ref() {
                    options.base_class = Some(base.clone());
                }
                if target.no_imports {
                    options.include_imports = false;
                }

                let ordered = bundle.registry.dependency_order();
                let mut cg = PythonCodegen::new(options);
                let failures = if target.output_settings.keep_going {
                    cg.emit_isolated(ordered.iter().map(|c| c.as_ref()))
                } else {
                    cg.emit_all(ordered.iter().map(|c| c.as_ref()))?;
                    Vec::new()
                };
                info!(classes = ordered.len() - failures.len(), "python generated");
                target.output_settings.finish(cg.into_string(), failures)
            }
            Command::Typescript(target) => {
                let bundle = target.input_settings.load_bundle()?;
                let mut options = target.output_settings.load_config()?.typescript;
                if target.no_runtime_import {
                    options.import_runtime = false;
                }
                if let Some(module) = target.runtime_module.as_ref() {
                    options.runtime_module = module.clone();
                }

                let ordered = bundle.registry.dependency_order();
                let mut cg = TypeScriptCodegen::new(options);
                for enumeration in &bundle.enums {
                    cg.emit_enum(enumeration);
                }
                let failures = if target.output_settings.keep_going {
                    cg.emit_isolated(ordered.iter().map(|c| c.as_ref()))
                } else {
                    cg.emit_all(ordered.iter().map(|c| c.as_ref()))?;
                    Vec::new()
                };
                for action in bundle.actions {
                    cg.bind(action);
                }
                info!(interfaces = ordered.len() - failures.len(), enums = bundle.enums.len(), "typescript generated");
                target.output_settings.finish(cg.into_string(), failures)
            }
            Command::Marshal(target) => {
                let bundle = target.input_settings.load_bundle()?;
                let marshaller = Marshaller::new(&bundle.registry);
                for data_path in resolve_file_path_patterns(&target.data)? {
                    let source = std::fs::read_to_string(&data_path)
                        .with_context(|| format!("failed to read payload {}", data_path.display()))?;
                    let document = serde_json::from_str::<serde_json::Value>(&source)
                        .with_context(|| format!("failed to parse payload {}", data_path.display()))?;
                    let payloads = match target.jq_expr.as_deref() {
                        Some(jq_expr) => crate::jq_exec::select_payloads(jq_expr, &document)
                            .with_context(|| format!("jq filter failed on {}", data_path.display()))?,
                        None => vec![document],
                    };
                    for payload in payloads {
                        let decoded = if target.no_validate {
                            marshaller.decode(&target.contract, &payload)
                        } else {
                            marshaller.decode_validated(&target.contract, &payload)
                        };
                        let instance = decoded
                            .with_context(|| format!("payload {} does not match {}", data_path.display(), target.contract))?;
                        println!("{}", serde_json::to_string_pretty(&marshal::encode(&instance))?);
                    }
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)
                .with_context(|| format!("invalid glob pattern: {pattern}"))?
                .collect::<Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                bail!("glob pattern matched no files: {pattern}");
            }
            out.append(&mut matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
