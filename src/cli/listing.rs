//! `--list-commands` and `--list-flags` printers.

use std::io::Write;

use colored::Colorize;
use itertools::Itertools;

use crate::application::error::Result;
use crate::application::error_ext::IoResultExt;
use crate::cli::output;
use crate::domain::{Arg, CommandTree, Opt};

fn title(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// `<name>` for required arguments, `[name]` otherwise.
pub fn args_summary(args: &[Arg]) -> String {
    args.iter()
        .enumerate()
        .map(|(pos, arg)| {
            let name = arg.display_name(pos);
            if arg.required {
                format!("<{}>", name)
            } else {
                format!("[{}]", name)
            }
        })
        .join(" ")
}

/// Every visible command below the root as `root:child:...`, aligned with
/// its short description.
pub fn print_commands<W: Write + ?Sized>(tree: &CommandTree, out: &mut W, color: bool) -> Result<()> {
    let root = tree.root();
    let entries: Vec<(String, &str)> = tree
        .iter()
        .filter(|(idx, node)| *idx != root && !node.command.hidden)
        .map(|(_, node)| {
            let summary = args_summary(&node.command.args);
            let label = if summary.is_empty() {
                node.path.clone()
            } else {
                format!("{} {}", node.path, summary)
            };
            (label, node.command.short.as_str())
        })
        .collect();

    if entries.is_empty() {
        writeln!(out, "No commands available.").io_context("write command list")?;
        return Ok(());
    }

    let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    writeln!(out, "{}\n", title("Available Commands:", color)).io_context("write command list")?;
    for (label, short) in &entries {
        let padding = " ".repeat(width - label.len() + 2);
        writeln!(out, "  {}{}{}", output::keyword(label, color), padding, short)
            .io_context("write command list")?;
    }
    Ok(())
}

fn flag_name(opt: &Opt) -> String {
    match opt.shorthand {
        Some(c) => format!("-{}, --{}", c, opt.flag),
        None => format!("--{}", opt.flag),
    }
}

fn flag_type(opt: &Opt) -> String {
    opt.value
        .as_ref()
        .map(|v| v.type_name().to_string())
        .unwrap_or_else(|| "bool".to_string())
}

fn flag_info(opt: &Opt) -> String {
    let mut parts = Vec::new();
    if !opt.default.is_empty() {
        parts.push(format!("default: {}", opt.default));
    }
    if opt.required {
        parts.push("required".to_string());
    }
    if !opt.envs.is_empty() {
        parts.push(format!(
            "env: {}",
            opt.envs.iter().map(|e| format!("${}", e)).join(", ")
        ));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn write_flag<W: Write + ?Sized>(out: &mut W, opt: &Opt, indent: usize, color: bool) -> Result<()> {
    writeln!(
        out,
        "{:indent$}{} {}{}",
        "",
        output::keyword(&flag_name(opt), color),
        output::dim(&flag_type(opt), color),
        flag_info(opt),
        indent = indent
    )
    .io_context("write flag list")?;
    if !opt.description.is_empty() {
        writeln!(out, "{:indent$}{}", "", opt.description, indent = indent + 4)
            .io_context("write flag list")?;
    }
    Ok(())
}

/// Global flags, then the flags each visible command declares beyond them.
pub fn print_flags<W: Write + ?Sized>(tree: &CommandTree, out: &mut W, color: bool) -> Result<()> {
    let root = tree.root();
    let globals = tree.global_flags();
    let mut printed = false;

    if !globals.is_empty() {
        writeln!(out, "{}\n", title("Global Flags:", color)).io_context("write flag list")?;
        for opt in &globals {
            write_flag(out, opt, 2, color)?;
        }
        writeln!(out).io_context("write flag list")?;
        printed = true;
    }

    let mut header_written = false;
    for (idx, node) in tree.iter() {
        if idx == root || node.command.hidden {
            continue;
        }
        let specific: Vec<&Opt> = node
            .command
            .options
            .iter()
            .filter(|o| !o.flag.is_empty() && !o.hidden)
            .filter(|o| !globals.iter().any(|g| g.flag == o.flag))
            .collect();
        if specific.is_empty() {
            continue;
        }
        if !header_written {
            writeln!(out, "{}\n", title("Command-Specific Flags:", color))
                .io_context("write flag list")?;
            header_written = true;
        }
        writeln!(out, "  {}:", output::keyword(&node.path, color)).io_context("write flag list")?;
        for opt in specific {
            write_flag(out, opt, 4, color)?;
        }
        writeln!(out).io_context("write flag list")?;
        printed = true;
    }

    if !printed {
        writeln!(out, "No flags available.").io_context("write flag list")?;
    }
    Ok(())
}
