//! Tests for the command tree snapshot produced by the tree builder.

use cmdtree::domain::{global_flags, CommandTree};
use cmdtree::{Command, Opt};

fn sample() -> CommandTree {
    CommandTree::new(
        Command::new("app")
            .option(Opt::new("verbose"))
            .child(
                Command::new("user")
                    .alias("u")
                    .child(Command::new("create <name>"))
                    .child(Command::new("delete <name>")),
            )
            .child(Command::new("admin").child(Command::new("reset"))),
    )
    .unwrap()
}

// ============================================================
// Queries
// ============================================================

#[test]
fn given_nested_commands_when_querying_names_then_paths_are_joined() {
    let tree = sample();

    let create = tree.find(["user", "create"]).unwrap();

    assert_eq!(tree.name(create), "create");
    assert_eq!(tree.full_name(create), "app user create");
    assert_eq!(tree.full_usage(create), "app user create <name>");
    assert_eq!(tree.path(create), "app:user:create");
    assert_eq!(tree.lookup("app:user:create"), Some(create));
}

#[test]
fn given_alias_when_finding_then_resolves_same_node() {
    let tree = sample();

    assert_eq!(tree.find(["u", "delete"]), tree.find(["user", "delete"]));
    assert!(tree.find(["user", "missing"]).is_none());
}

#[test]
fn given_tree_when_iterating_then_pre_order_with_sorted_children() {
    let tree = sample();

    let paths: Vec<&str> = tree.iter().map(|(_, node)| node.path.as_str()).collect();

    assert_eq!(
        paths,
        vec![
            "app",
            "app:admin",
            "app:admin:reset",
            "app:user",
            "app:user:create",
            "app:user:delete"
        ]
    );
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.depth(), 3);
}

// ============================================================
// Initialization
// ============================================================

#[test]
fn given_root_when_built_then_global_flags_injected_at_root_only() {
    let tree = sample();
    let user = tree.find(["user"]).unwrap();

    let globals: Vec<&str> = tree.global_flags().iter().map(|o| o.flag.as_str()).collect();

    for g in global_flags() {
        assert!(globals.contains(&g.flag.as_str()), "missing {}", g.flag);
    }
    assert!(globals.contains(&"verbose"));
    assert!(tree.command(user).options.is_empty());
    assert_eq!(tree.full_options(user).len(), globals.len());
}

#[test]
fn given_root_declaring_global_name_when_built_then_declaration_kept() {
    let tree = CommandTree::new(
        Command::new("app").option(Opt::new("debug").description("trace everything")),
    )
    .unwrap();

    let debug: Vec<_> = tree
        .command(tree.root())
        .options
        .iter()
        .filter(|o| o.flag == "debug")
        .collect();

    assert_eq!(debug.len(), 1);
    assert_eq!(debug[0].description, "Trace everything.");
}

#[test]
fn given_empty_usage_when_built_then_root_is_unnamed() {
    let tree = CommandTree::new(Command::default()).unwrap();

    assert_eq!(tree.name(tree.root()), "unnamed");
}

#[test]
fn given_options_when_built_then_sorted_by_flag_or_env() {
    let tree = CommandTree::new(
        Command::new("app").child(
            Command::new("run")
                .option(Opt::new("zeta"))
                .option(Opt::from_env("ALPHA_TOKEN"))
                .option(Opt::new("beta")),
        ),
    )
    .unwrap();
    let run = tree.find(["run"]).unwrap();

    let keys: Vec<&str> = tree.command(run).options.iter().map(|o| o.key()).collect();

    assert_eq!(keys, vec!["ALPHA_TOKEN", "beta", "zeta"]);
}
