use std::io::Write;
use std::process;

use cmdtree::cli::output;
use cmdtree::domain::ValidationError;
use cmdtree::{
    exitcode, handler, middleware, require_n_args, validate, Arg, Bool, Command, CommandTree,
    Duration, Enum, HostPort, Int64, MiddlewareFunc, Opt, Settings, Str, Url,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e);
            process::exit(exitcode::CONFIG);
        }
    };

    let tree = match CommandTree::with_version(demo(), env!("CARGO_PKG_VERSION")) {
        Ok(tree) => tree,
        Err(e) => {
            output::error(&e);
            process::exit(exitcode::CONFIG);
        }
    };

    let result = tree
        .invoke(Vec::<String>::new())
        .with_os()
        .with_settings(settings)
        .run();

    if let Err(e) = result {
        output::error(&e);
        process::exit(exitcode::for_error(&e));
    }
}

/// Install the stderr subscriber from `--debug` / `--log-level`.
fn logging() -> MiddlewareFunc {
    middleware(|next| {
        handler(move |ctx, inv| {
            let level = if inv.flags().get_bool("debug") == Some(true) {
                LevelFilter::DEBUG
            } else {
                inv.flags()
                    .get_string("log-level")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(LevelFilter::INFO)
            };
            setup_logging(level);
            inv.annotations
                .insert("log-level".into(), level.to_string().into());
            next(ctx, inv)
        })
    })
}

fn setup_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // a second install (tests, nested runs) is not an error
    let _ = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init();
    tracing::debug!(%level, "logging initialised");
}

fn echo() -> Command {
    let upper = Bool::new();
    let text = Str::new();
    let (upper_h, text_h) = (upper.clone(), text.clone());
    Command::new("echo <text>")
        .short("Print the text argument")
        .option(
            Opt::new("upper")
                .short('u')
                .description("print in upper case")
                .value(upper),
        )
        .arg(Arg::new("text").required().value(text))
        .handler(move |_ctx, inv| {
            let text = text_h.value();
            let text = if upper_h.value() {
                text.to_uppercase()
            } else {
                text
            };
            writeln!(inv.stdout(), "{}", text)?;
            Ok(())
        })
}

fn user() -> Command {
    let name = Str::new();
    let age = validate(Int64::new(), |v: &Int64| {
        if (0..=150).contains(&v.value()) {
            Ok(())
        } else {
            Err(ValidationError::new("age", "must be between 0 and 150"))
        }
    });
    let role = Enum::new(["admin", "member", "guest"]);

    Command::new("user")
        .short("Manage users")
        .alias("u")
        .child(
            Command::new("create")
                .short("Create a user from query, form or JSON arguments")
                .long("Create a user.\n\nArguments bind by name from name=bob&age=30, name=bob age=30 or {\"name\":\"bob\"}, or by position.")
                .arg(Arg::new("name").required().value(name))
                .arg(Arg::new("age").default_value("0").value(age))
                .arg(Arg::new("role").default_value("member").value(role))
                .handler(|_ctx, inv| {
                    let user: serde_json::Map<String, serde_json::Value> = inv
                        .bound_args()
                        .iter()
                        .map(|a| (a.name.clone(), a.render().into()))
                        .collect();
                    writeln!(inv.stdout(), "{}", serde_json::Value::Object(user))?;
                    Ok(())
                }),
        )
}

fn greet() -> Command {
    let name = Str::new();
    let name_h = name.clone();
    Command::new("greet")
        .short("Greet someone")
        .option(
            Opt::new("name")
                .short('n')
                .description("who to greet")
                .env("CMDTREE_DEMO_NAME")
                .env("USER")
                .default_value("world")
                .value(name),
        )
        .handler(move |_ctx, inv| {
            writeln!(inv.stdout(), "hello, {}", name_h.value())?;
            Ok(())
        })
}

fn sleep() -> Command {
    let pause = Duration::new();
    let pause_h = pause.clone();
    Command::new("sleep <duration>")
        .short("Wait for a Go-style duration, e.g. 1.5s")
        .arg(Arg::new("duration").value(pause))
        .middleware(require_n_args(1))
        .handler(move |ctx, inv| {
            let pause = pause_h.value();
            if !ctx.is_cancelled() {
                std::thread::sleep(pause);
            }
            writeln!(inv.stdout(), "slept {:?}", pause)?;
            Ok(())
        })
}

fn serve() -> Command {
    let listen = HostPort::new();
    let upstream = Url::new();
    let (listen_h, upstream_h) = (listen.clone(), upstream.clone());
    Command::new("serve")
        .short("Show a resolved server configuration")
        .option(
            Opt::new("listen")
                .short('l')
                .description("address to listen on")
                .env("CMDTREE_DEMO_LISTEN")
                .default_value("127.0.0.1:8080")
                .value(listen),
        )
        .option(
            Opt::new("upstream")
                .description("upstream base URL")
                .required()
                .value(upstream),
        )
        .handler(move |_ctx, inv| {
            let (host, port) = listen_h.value();
            writeln!(inv.stdout(), "listening on {}:{} -> {}", host, port, upstream_h.value())?;
            Ok(())
        })
}

fn demo() -> Command {
    Command::new("cmdtree-demo")
        .short("Demo host for the cmdtree engine")
        .long("Demo host for the cmdtree engine.\n\nSymlink the binary as `echo` or `greet` to dispatch by program name.")
        .middleware(logging())
        .child(echo())
        .child(user())
        .child(greet())
        .child(
            Command::new("hello")
                .short("Old name of greet")
                .deprecated("use greet instead")
                .handler(|_ctx, inv| {
                    writeln!(inv.stdout(), "hello")?;
                    Ok(())
                }),
        )
        .child(sleep())
        .child(serve())
}
