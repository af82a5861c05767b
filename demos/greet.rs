//! Greeter demo
//!
//! ```text
//! cargo run --example greet -- greet Alice 30 --deaf
//! cargo run --example greet -- --host example.org greet Alice 30 farewell Alice
//! RUST_LOG=decli=debug cargo run --example greet -- greet Bob 41
//! ```

use decli::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let mut app = App::new("greet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Say hello, and goodbye");
    app.global("host", "localhost")?;

    app.wrap(WrapperSpec::new("session").param("host").on_start(|args| {
        let host: String = args.value("host")?;
        eprintln!("connected to {}", host);
        Ok(Teardown::sync(move || {
            eprintln!("disconnected from {}", host);
            Ok(())
        }))
    }))?;

    app.register(
        CommandSpec::new("greet")
            .doc(
                "Greet someone

                :name: who to greet
                :age: their age in years
                :deaf: shout the greeting",
            )
            .param(ParamSpec::positional("name"))
            .param(ParamSpec::positional("age").typed(ValueType::Int))
            .param(ParamSpec::keyword("deaf", false))
            .handler(|args| {
                let name: String = args.value("name")?;
                let age: i64 = args.value("age")?;
                let greeting = format!("Hi {}, you are {}!", name, age);
                if args.flag("deaf") {
                    println!("{}", greeting.to_uppercase());
                } else {
                    println!("{}", greeting);
                }
                Ok(())
            }),
    )?;

    app.register(
        CommandSpec::new("farewell")
            .doc("Say goodbye\n\n:names: everyone leaving")
            .param(ParamSpec::variadic("names"))
            .param(ParamSpec::keyword("host", Value::None))
            .async_handler(|args| async move {
                let names: Vec<String> = args.value("names")?;
                let host: String = args.value("host")?;
                for name in names {
                    println!("Goodbye {} from {}", name, host);
                }
                Ok::<_, anyhow::Error>(())
            }),
    )?;

    app.run()
}
