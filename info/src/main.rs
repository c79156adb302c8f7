//! Prints build and link metadata for consumers of the hwbind library.
//!
//! Every output is a pure function of compile-time constants; the tool
//! holds no runtime state. Options are mutually combinable and their flag
//! strings are printed space-separated on one line.

use clap::{Parser, ValueEnum};

/// Install prefix baked in at build time.
const PREFIX: &str = match option_env!("HWBIND_INSTALL_PREFIX") {
    Some(prefix) => prefix,
    None => "/usr/local",
};

/// Additional system libraries needed when linking statically.
const STATIC_LIBS: &str = "-lpthread -ldl";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lang {
    #[value(name = "C")]
    C,
    #[value(name = "C++")]
    Cplusplus,
    #[value(name = "Fortran")]
    Fortran,
}

#[derive(Debug, Parser)]
#[command(name = "hwbind-info", version, about = "Print build and link metadata for hwbind")]
struct Args {
    /// Output all pre-processor and compiler flags
    #[arg(long)]
    cflags: bool,

    /// Output -I flags
    #[arg(long = "cflags-only-I")]
    cflags_only_i: bool,

    /// Output all linker flags
    #[arg(long)]
    libs: bool,

    /// Output -L flags
    #[arg(long = "libs-only-L")]
    libs_only_big_l: bool,

    /// Output -l flags
    #[arg(long = "libs-only-l")]
    libs_only_small_l: bool,

    /// Set language for output
    #[arg(long, value_enum, default_value = "C")]
    lang: Lang,

    /// Output linker flags for static linking
    #[arg(long = "static")]
    static_link: bool,

    /// Output build configuration
    #[arg(long)]
    config: bool,
}

fn cflags_only_i() -> String {
    format!("-I{PREFIX}/include")
}

fn cflags() -> String {
    cflags_only_i()
}

fn libs_only_big_l() -> String {
    format!("-L{PREFIX}/lib")
}

fn libs_only_small_l(static_link: bool) -> String {
    if static_link {
        format!("-lhwbind {STATIC_LIBS}")
    } else {
        "-lhwbind".to_string()
    }
}

fn libs(static_link: bool) -> String {
    format!("{} {}", libs_only_big_l(), libs_only_small_l(static_link))
}

fn show_config() {
    let (version, subversion) = hwbind_core::api_version();
    println!("Package: {}", env!("CARGO_PKG_NAME"));
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("API Version: {version}.{subversion}");
    println!("Package URL: {}", env!("CARGO_PKG_HOMEPAGE"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!("Install Prefix: {PREFIX}");
    println!("Static Libs: {STATIC_LIBS}");
}

fn main() {
    let args = Args::parse();

    if args.config {
        show_config();
        return;
    }

    let mut flags: Vec<String> = Vec::new();
    if args.cflags {
        flags.push(cflags());
    }
    if args.cflags_only_i {
        flags.push(cflags_only_i());
    }
    if args.libs {
        flags.push(libs(args.static_link));
    }
    if args.libs_only_big_l {
        flags.push(libs_only_big_l());
    }
    if args.libs_only_small_l {
        flags.push(libs_only_small_l(args.static_link));
    }

    if !flags.is_empty() {
        println!("{}", flags.join(" "));
    }
}
