//! External build tools.
//!
//! Presets never spawn processes themselves; they go through a [`Toolchain`].
//! [`SystemToolchain`] runs the real executables, tests substitute their own.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::error::{BuildError, Result};

/// The tools a step can name in its `Util` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Esbuild,
    Terser,
    Qjsc,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Esbuild => "esbuild",
            Tool::Terser => "terser",
            Tool::Qjsc => "qjsc",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "esbuild" => Ok(Tool::Esbuild),
            "terser" => Ok(Tool::Terser),
            "qjsc" => Ok(Tool::Qjsc),
            other => Err(format!("unknown util {other}")),
        }
    }
}

/// Invocations of the three build tools.
pub trait Toolchain {
    /// Bundle `entry` with the given build options and return the output.
    fn bundle(&self, entry: &Path, options: &Value) -> Result<Vec<u8>>;

    /// Run the minifier inside `dir` with `args`.
    fn minify(&self, dir: &Path, args: &[OsString]) -> Result<()>;

    /// Run the bytecode compiler inside `dir` with `args`.
    fn compile(&self, dir: &Path, args: &[OsString]) -> Result<()>;
}

/// Executable locations for [`SystemToolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub esbuild: PathBuf,
    pub terser: PathBuf,
    pub qjsc: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            esbuild: PathBuf::from("esbuild"),
            terser: PathBuf::from("terser"),
            qjsc: PathBuf::from("qjsc"),
        }
    }
}

/// Runs the tools as child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemToolchain {
    paths: ToolPaths,
}

impl SystemToolchain {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    /// Run a tool in `dir` with stdio forwarded to ours.
    fn run_in_dir(&self, tool: Tool, program: &Path, dir: &Path, args: &[OsString]) -> Result<()> {
        debug!(%tool, dir = %dir.display(), ?args, "Running tool");

        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| start_failed(tool, program, e))?;

        if !status.success() {
            return Err(BuildError::tool(tool, format!("got error {status}")));
        }
        Ok(())
    }
}

impl Toolchain for SystemToolchain {
    fn bundle(&self, entry: &Path, options: &Value) -> Result<Vec<u8>> {
        let mut args = vec![entry.as_os_str().to_owned()];
        args.extend(esbuild_flags(options)?.into_iter().map(OsString::from));
        debug!(tool = %Tool::Esbuild, ?args, "Running tool");

        let output = Command::new(&self.paths.esbuild)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| start_failed(Tool::Esbuild, &self.paths.esbuild, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let errors: Vec<&str> = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();

            let message = if errors.is_empty() {
                format!("exited with {} and no diagnostics", output.status)
            } else {
                format!("got {} error(s): {}", errors.len(), errors.join("; "))
            };
            return Err(BuildError::tool(Tool::Esbuild, message));
        }

        if output.stdout.is_empty() {
            return Err(BuildError::tool(Tool::Esbuild, "no files outputted"));
        }
        Ok(output.stdout)
    }

    fn minify(&self, dir: &Path, args: &[OsString]) -> Result<()> {
        self.run_in_dir(Tool::Terser, &self.paths.terser, dir, args)
    }

    fn compile(&self, dir: &Path, args: &[OsString]) -> Result<()> {
        self.run_in_dir(Tool::Qjsc, &self.paths.qjsc, dir, args)
    }
}

fn start_failed(tool: Tool, program: &Path, e: std::io::Error) -> BuildError {
    BuildError::tool(tool, format!("failed to start {}: {e}", program.display()))
}

/// Options the runner sets itself; they are dropped from user options.
const RESERVED_OPTIONS: &[&str] = &["entry-points", "outfile", "outdir", "write", "allow-overwrite"];

/// List options esbuild takes as one `--flag:item` per element. Other lists
/// are passed comma-separated.
const REPEATED_OPTIONS: &[&str] = &["external", "inject", "pure", "drop"];

/// CLI names of the Go API's integer enums, indexed by value. `None` is the
/// Go zero value meaning "esbuild's default", which needs no flag.
fn go_enum(flag: &str) -> Option<&'static [Option<&'static str>]> {
    let names: &'static [Option<&'static str>] = match flag {
        "format" => &[None, Some("iife"), Some("cjs"), Some("esm")],
        "platform" => &[None, Some("browser"), Some("node"), Some("neutral")],
        "target" => &[
            None,
            Some("esnext"),
            Some("es5"),
            Some("es2015"),
            Some("es2016"),
            Some("es2017"),
            Some("es2018"),
            Some("es2019"),
            Some("es2020"),
            Some("es2021"),
            Some("es2022"),
            Some("es2023"),
            Some("es2024"),
        ],
        "sourcemap" => &[
            None,
            Some("inline"),
            Some("linked"),
            Some("external"),
            Some("both"),
        ],
        "tree-shaking" => &[None, Some("false"), Some("true")],
        "legal-comments" => &[
            None,
            Some("none"),
            Some("inline"),
            Some("eof"),
            Some("linked"),
            Some("external"),
        ],
        "charset" => &[None, Some("ascii"), Some("utf8")],
        "log-level" => &[
            Some("silent"),
            Some("verbose"),
            Some("debug"),
            Some("info"),
            Some("warning"),
            Some("error"),
        ],
        "jsx" => &[Some("transform"), Some("preserve"), Some("automatic")],
        _ => return None,
    };
    Some(names)
}

/// Go `Loader` values, used as the values of the `Loader` map.
const LOADERS: &[Option<&str>] = &[
    None,
    Some("base64"),
    Some("binary"),
    Some("copy"),
    Some("css"),
    Some("dataurl"),
    Some("default"),
    Some("empty"),
    Some("file"),
    Some("global-css"),
    Some("js"),
    Some("json"),
    Some("jsx"),
    Some("local-css"),
    Some("text"),
    Some("ts"),
    Some("tsx"),
];

/// Go `Drop` bit flags.
const DROP_FLAGS: &[(u64, &str)] = &[(1, "console"), (2, "debugger")];

fn invalid(option: &str, message: impl Into<String>) -> BuildError {
    BuildError::InvalidOption {
        tool: Tool::Esbuild,
        option: option.to_string(),
        message: message.into(),
    }
}

/// Look up integer `value` of `option` in a Go enum table.
fn enum_name(
    option: &str,
    table: &[Option<&'static str>],
    value: &serde_json::Number,
) -> Result<Option<&'static str>> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .and_then(|n| table.get(n))
        .copied()
        .ok_or_else(|| invalid(option, format!("unknown enum value {value}")))
}

/// Translate an esbuild options object into command-line flags.
///
/// Keys may be written as in the Go API (`MinifyWhitespace`, `JSXFactory`)
/// or the JS API (`minifyWhitespace`); both become `--minify-whitespace`.
/// Go integer enums are mapped to their CLI names and `false` is passed
/// explicitly. Values esbuild's CLI cannot express are rejected.
pub fn esbuild_flags(options: &Value) -> Result<Vec<String>> {
    let map = match options {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(invalid("EsbuildOptions", "expected an object")),
    };

    let mut flags = Vec::new();
    for (key, value) in map {
        let flag = kebab_case(key);
        if RESERVED_OPTIONS.contains(&flag.as_str()) {
            continue;
        }

        match value {
            Value::Null => {}
            Value::Bool(b) if flag == "tree-shaking" || !b => flags.push(format!("--{flag}={b}")),
            Value::Bool(_) => flags.push(format!("--{flag}")),
            Value::String(s) => flags.push(format!("--{flag}={s}")),
            Value::Number(n) if flag == "drop" => {
                let bits = n
                    .as_u64()
                    .ok_or_else(|| invalid(key, format!("unknown drop flags {n}")))?;
                let known: u64 = DROP_FLAGS.iter().map(|(bit, _)| bit).sum();
                if bits & !known != 0 {
                    return Err(invalid(key, format!("unknown drop flags {n}")));
                }
                for (bit, name) in DROP_FLAGS {
                    if bits & bit != 0 {
                        flags.push(format!("--drop:{name}"));
                    }
                }
            }
            Value::Number(n) => match go_enum(&flag) {
                Some(table) => {
                    if let Some(name) = enum_name(key, table, n)? {
                        flags.push(format!("--{flag}={name}"));
                    }
                }
                None => flags.push(format!("--{flag}={n}")),
            },
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| scalar(key, item))
                    .collect::<Result<Vec<_>>>()?;
                if REPEATED_OPTIONS.contains(&flag.as_str()) {
                    flags.extend(items.iter().map(|item| format!("--{flag}:{item}")));
                } else {
                    flags.push(format!("--{flag}={}", items.join(",")));
                }
            }
            Value::Object(entries) => {
                for (k, v) in entries {
                    let v = match v {
                        Value::Number(n) if flag == "loader" => {
                            enum_name(key, LOADERS, n)?.ok_or_else(|| {
                                invalid(key, format!("loader for {k} cannot be LoaderNone"))
                            })?.to_string()
                        }
                        other => scalar(key, other)?,
                    };
                    flags.push(format!("--{flag}:{k}={v}"));
                }
            }
        }
    }
    Ok(flags)
}

fn scalar(option: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        _ => Err(invalid(option, format!("cannot pass {value} on the command line"))),
    }
}

/// `JSXImportSource` -> `jsx-import-source`, `minifyWhitespace` ->
/// `minify-whitespace`. A run of capitals is one word.
fn kebab_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            out.push('-');
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
