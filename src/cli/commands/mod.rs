use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub mod logging;

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_PUBLIC_DIR: &str = "public-dir";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";
pub const ARG_SESSION_MAX: &str = "session-max";
pub const ARG_SERIALIZE_SIGNUPS: &str = "serialize-signups";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("enroll")
        .about("User registration service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("ENROLL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("ENROLL_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PUBLIC_DIR)
                .long("public-dir")
                .help("Directory with static assets")
                .default_value("public")
                .env("ENROLL_PUBLIC_DIR"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long("session-ttl-seconds")
                .help("Session lifetime in seconds, also the cookie Max-Age")
                .default_value("604800")
                .env("ENROLL_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX)
                .long("session-max")
                .help("Maximum number of live flash sessions; the oldest is evicted past it")
                .default_value("10000")
                .env("ENROLL_SESSION_MAX")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long("session-cookie-secure")
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("ENROLL_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_SERIALIZE_SIGNUPS)
                .long("serialize-signups")
                .help("Serialize concurrent signups for the same email within this process")
                .env("ENROLL_SERIALIZE_SIGNUPS")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        );

    logging::with_args(command)
}
