mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::unbounded;

use statepad_device::{ControlTree, DeviceManager};
use statepad_layout::{LayoutDescriptor, LayoutRegistry, LayoutWorkspace, VariantTag};
use statepad_rebind::{ExpectedControl, RebindConfig, RebindState, RebindStatus};
use statepadd::capture::Capture;
use statepadd::replay::{replay, ReplayOptions};
use statepadd::{parse_hex, Error, Result};

use crate::cli::{Cli, Command};

#[allow(clippy::print_stderr)]
fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::setup(cli.verbose, cli.no_color) {
        eprintln!("unable to set up logger: {err}");
        return ExitCode::FAILURE;
    }

    let result = load_registry(cli.layouts.as_deref()).and_then(|registry| match cli.command {
        Command::Layouts { name, variant } => list_layouts(&registry, name, variant),
        Command::Decode {
            layout,
            hex,
            variant,
            control,
        } => decode(&registry, &layout, &hex, variant, control),
        Command::Replay {
            capture,
            realtime,
            rebind,
            expect,
            timeout_ms,
        } => run_replay(registry, &capture, realtime, rebind, expect, timeout_ms),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_registry(dir: Option<&std::path::Path>) -> Result<LayoutRegistry> {
    let mut registry = LayoutRegistry::with_builtin()?;
    let workspace = match dir {
        Some(dir) => LayoutWorkspace::new(Some(dir))?,
        None => match LayoutWorkspace::new(None) {
            Ok(workspace) => workspace,
            Err(err) => {
                print_debug!("no layout workspace: {err}");
                return Ok(registry);
            }
        },
    };
    for layout in workspace.load_into(&mut registry)? {
        print_debug!("loaded layout {}", layout.name());
    }
    Ok(registry)
}

fn variant_for(layout: &LayoutDescriptor, requested: Option<String>) -> VariantTag {
    requested
        .map(|tag| VariantTag::new(&tag))
        .or_else(|| layout.default_variant().cloned())
        .or_else(|| layout.variant_rules().first().map(|rule| rule.tag.clone()))
        .unwrap_or_else(|| VariantTag::new(""))
}

fn list_layouts(
    registry: &LayoutRegistry,
    name: Option<String>,
    variant: Option<String>,
) -> Result<()> {
    let Some(name) = name else {
        for layout in registry.iter() {
            print_info!(
                "{} ({}) format \"{}\", {} bytes, {} controls",
                layout.name().bold(),
                layout.display_name(),
                layout.state_format(),
                layout.size_in_bytes(),
                layout.controls().len()
            );
        }
        return Ok(());
    };

    let layout = registry
        .get(&name)
        .ok_or_else(|| statepad_layout::LayoutError::UnknownLayout(name.clone()))?;
    let tags: Vec<String> = layout.known_variants().iter().map(ToString::to_string).collect();
    print_info!("{} variants: {}", layout.name().bold(), tags.join(", "));

    let tag = variant.map(|tag| VariantTag::new(&tag));
    for control in layout.controls() {
        if let Some(tag) = &tag {
            if !tag.activates(control.variant()) {
                continue;
            }
        }
        print_info!(
            "  {:<24} bit {:>4} size {:>2} {:<8} {:?}{}",
            control.name(),
            control.bit_offset(),
            control.bit_size(),
            control.format().to_string(),
            control.kind(),
            control
                .variant()
                .map(|v| format!(" [{v}]"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn decode(
    registry: &LayoutRegistry,
    name: &str,
    hex: &str,
    variant: Option<String>,
    only: Option<String>,
) -> Result<()> {
    let layout = registry
        .get(name)
        .ok_or_else(|| statepad_layout::LayoutError::UnknownLayout(name.to_string()))?;
    let bytes = parse_hex(hex)?;
    let expected = layout.size_in_bytes() as usize;
    if bytes.len() != expected {
        return Err(statepad_device::Error::StateSizeMismatch {
            expected,
            actual: bytes.len(),
        }
        .into());
    }

    let variant = variant_for(&layout, variant);
    let tree = ControlTree::build(Arc::clone(&layout), variant)?;
    if let Some(path) = only {
        let value = tree.read(&bytes, &path)?;
        print_info!("{path} = {value}");
        return Ok(());
    }

    for (id, node) in tree.nodes() {
        if !tree.is_readable(id) {
            continue;
        }
        match tree.read_node(&bytes, id) {
            Ok(value) => {
                print_info!("{:<24} {value}", node.path());
            }
            Err(err) => {
                print_warning!("{}: {err}", node.path());
            }
        }
    }
    Ok(())
}

fn run_replay(
    registry: LayoutRegistry,
    path: &std::path::Path,
    realtime: bool,
    rebind: bool,
    expect: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let capture = Capture::load(path)?;

    let mut config = capture.rebind_config()?;
    if config.is_none() && (rebind || expect.is_some() || timeout_ms.is_some()) {
        config = Some(RebindConfig::new());
    }
    if let Some(config) = config.as_mut() {
        if let Some(expect) = expect {
            let expected: ExpectedControl = expect.parse().map_err(Error::InvalidExpected)?;
            config.expected = Some(expected);
        }
        if let Some(ms) = timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
    }

    let (stop_tx, stop_rx) = unbounded::<()>();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        print_warning!("failed to set Ctrl+C handler: {err}");
    }

    let manager = DeviceManager::new(Arc::new(registry));
    print_info!("replaying {} ({} frames)", path.display(), capture.frames.len());
    let report = replay(
        &manager,
        &capture,
        ReplayOptions {
            realtime,
            rebind: config,
            stop: Some(stop_rx),
        },
    )?;

    for obs in &report.observations {
        print_debug!("#{} {} = {} (was {})", obs.sequence, obs.path, obs.value, obs.previous);
    }
    print_info!(
        "{} frames, {} rejected, {} observations",
        report.frames,
        report.rejected,
        report.observations.len()
    );
    if report.interrupted {
        print_warning!("replay interrupted");
    }
    if let Some(status) = &report.rebind {
        print_rebind(status);
    }
    Ok(())
}

fn print_rebind(status: &RebindStatus) {
    match status.state {
        RebindState::Matched => {
            let Some(result) = &status.result else {
                return;
            };
            for binding in &result.bindings {
                match &binding.part {
                    Some(part) => print_info!("rebind {part}: {}", binding.path.green()),
                    None => print_info!("rebind: {}", binding.path.green()),
                }
            }
            for warning in &result.warnings {
                print_warning!("{warning:?}");
            }
        }
        RebindState::TimedOut | RebindState::Cancelled => {
            print_warning!("rebind ended without a match: {:?}", status.reason);
        }
        RebindState::Idle | RebindState::Listening => {
            print_info!(
                "rebind still listening{}",
                status
                    .part
                    .as_deref()
                    .map(|p| format!(" for part {p}"))
                    .unwrap_or_default()
            );
        }
    }
}
