//! Help rendering for a resolved command.

use std::io::{self, Write};
use std::sync::OnceLock;

use generational_arena::Index;
use itertools::Itertools;
use regex::Regex;

use crate::application::error::{Result, UnknownSubcommandError};
use crate::application::error_ext::IoResultExt;
use crate::application::Invocation;
use crate::cli::output::{dim, header, keyword, warn};
use crate::domain::{Arg, CommandTree, Opt, Value};

/// Usage strings containing a `<placeholder>` accept free-form arguments.
fn usage_wants_args(usage: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.*>").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(usage))
}

/// Type column: choices when the value offers a choice set.
fn type_label(value: Option<&dyn Value>, untyped: &str) -> String {
    let Some(value) = value else {
        return untyped.to_string();
    };
    match value.choices() {
        Some(choices) if value.type_name().ends_with("Array") => {
            format!("[{}]", choices.join("|"))
        }
        Some(choices) => choices.join("|"),
        None => value.type_name().to_string(),
    }
}

/// Option groups from the root down to `idx`: `Global` for the root,
/// then each command's own non-global options under its name.
fn option_groups(tree: &CommandTree, idx: Index) -> Vec<(String, Vec<&Opt>)> {
    let globals: Vec<&str> = tree.global_flags().iter().map(|o| o.flag.as_str()).collect();
    tree.path_from_root(idx)
        .into_iter()
        .filter_map(|i| {
            let is_root = tree.parent(i).is_none();
            let opts: Vec<&Opt> = tree
                .command(i)
                .options
                .iter()
                .filter(|o| !o.flag.is_empty() && !o.hidden)
                .filter(|o| is_root || !globals.contains(&o.flag.as_str()))
                .collect();
            if opts.is_empty() {
                return None;
            }
            let name = if is_root { "Global" } else { tree.name(i) };
            Some((name.to_string(), opts))
        })
        .collect()
}

fn write_option<W: Write + ?Sized>(out: &mut W, opt: &Opt, color: bool) -> io::Result<()> {
    let names = match opt.shorthand {
        Some(c) => format!("  -{}, --{}", c, opt.flag),
        None => format!("      --{}", opt.flag),
    };
    let mut line = format!(
        "{} {}",
        keyword(&names, color),
        dim(&type_label(opt.value.as_deref(), "bool"), color)
    );
    if !opt.envs.is_empty() {
        let envs = opt.envs.iter().map(|e| format!("${}", e)).join(", ");
        line.push_str(&format!(", {}", keyword(&envs, color)));
    }
    let mut extra = Vec::new();
    if !opt.default.is_empty() {
        extra.push(format!("default: {}", opt.default));
    }
    if opt.required {
        extra.push("required".to_string());
    }
    if !extra.is_empty() {
        line.push_str(&format!(" ({})", extra.join(", ")));
    }
    writeln!(out, "{}", line)?;
    if !opt.description.is_empty() {
        writeln!(out, "          {}", opt.description)?;
    }
    if !opt.deprecated.is_empty() {
        let msg = format!("DEPRECATED: {}", opt.deprecated);
        writeln!(out, "          {}", warn(&msg, color))?;
    }
    Ok(())
}

fn write_arg<W: Write + ?Sized>(out: &mut W, pos: usize, arg: &Arg, color: bool) -> io::Result<()> {
    let name = arg.display_name(pos);
    let mut line = format!(
        "  {} {}",
        keyword(&name, color),
        dim(&type_label(arg.value.as_deref(), "string"), color)
    );
    if !arg.default.is_empty() {
        line.push_str(&format!(" (default: {})", arg.default));
    } else if arg.required {
        line.push_str(" (required)");
    }
    writeln!(out, "{}", line)?;
    if !arg.description.is_empty() {
        writeln!(out, "          {}", arg.description)?;
    }
    Ok(())
}

/// Write the help page of `idx` to `out`.
pub fn render_help<W: Write + ?Sized>(
    tree: &CommandTree,
    idx: Index,
    out: &mut W,
    color: bool,
) -> io::Result<()> {
    let cmd = tree.command(idx);

    writeln!(out, "{}", header("usage", color))?;
    writeln!(out, "  {}", tree.full_usage(idx))?;
    writeln!(out)?;

    let about = if cmd.long.is_empty() { &cmd.short } else { &cmd.long };
    if !about.is_empty() {
        writeln!(out, "{}", about.trim_end())?;
        writeln!(out)?;
    }

    if !cmd.deprecated.is_empty() {
        let msg = format!("DEPRECATED: {}", cmd.deprecated);
        writeln!(out, "{}", warn(&msg, color))?;
        writeln!(out)?;
    }

    if !cmd.aliases.is_empty() {
        writeln!(out, "{}", header("aliases", color))?;
        writeln!(out, "  {}", cmd.aliases.join(", "))?;
        writeln!(out)?;
    }

    let visible: Vec<Index> = tree
        .children(idx)
        .iter()
        .copied()
        .filter(|&c| !tree.command(c).hidden)
        .collect();
    if !visible.is_empty() {
        let width = visible.iter().map(|&c| tree.name(c).len()).max().unwrap_or(0);
        writeln!(out, "{}", header("subcommands", color))?;
        for &child in &visible {
            let name = tree.name(child);
            let padding = " ".repeat(width - name.len() + 4);
            writeln!(
                out,
                "    {}{}{}",
                keyword(name, color),
                padding,
                tree.command(child).short
            )?;
        }
        writeln!(out)?;
    }

    if !cmd.args.is_empty() {
        writeln!(out, "{}", header("arguments", color))?;
        for (pos, arg) in cmd.args.iter().enumerate() {
            write_arg(out, pos, arg, color)?;
        }
        writeln!(out)?;
    }

    for (group, opts) in option_groups(tree, idx) {
        writeln!(out, "{}", header(&format!("{} options", group), color))?;
        for opt in opts {
            write_option(out, opt, color)?;
        }
        writeln!(out)?;
    }

    if !visible.is_empty() {
        writeln!(
            out,
            "Run '{} <subcommand> --help' for more information on a command.",
            tree.full_name(idx)
        )?;
    }
    Ok(())
}

/// Help handler: renders the page of the resolved command on stdout.
///
/// Leftover arguments on a command whose usage takes no `<placeholder>`
/// name an unknown subcommand; that is reported on stderr and returned as
/// an error so the process exits non-zero.
pub fn show_help(inv: &mut Invocation<'_>) -> Result<()> {
    let tree = inv.tree();
    let idx = inv.command_index();
    let color = inv.settings().color;

    render_help(tree, idx, inv.stdout(), color).io_context("write help")?;
    inv.stdout().flush().io_context("write help")?;

    let args = inv.args().to_vec();
    let Some(first) = args.first() else {
        return Ok(());
    };
    if usage_wants_args(&tree.command(idx).usage) {
        return Ok(());
    }
    writeln!(inv.stderr(), "---\nerror: unknown subcommand {:?}", first)
        .io_context("write help")?;
    Err(UnknownSubcommandError { args }.into())
}
