use std::path::PathBuf;

use clap::Parser as ClapParser;
use dreamrt_vm::{Runtime, RuntimeConfig, Value};
use tracing_subscriber::EnvFilter;

fn main() {
    let opt = Opt::parse();

    let default_level = if opt.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(opt) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> dreamrt_vm::Result<()> {
    let (root, name) = match (opt.savefile.parent(), opt.savefile.file_name()) {
        (Some(parent), Some(name)) => (parent.to_owned(), name.to_string_lossy().into_owned()),
        _ => {
            return Err(dreamrt_vm::RuntimeError::invalid_arguments(format!(
                "not a savefile path: {}",
                opt.savefile.display()
            )))
        }
    };
    if !opt.savefile.is_file() {
        return Err(dreamrt_vm::RuntimeError::invalid_arguments(format!(
            "no savefile at {}",
            opt.savefile.display()
        )));
    }
    let mut rt = Runtime::new(RuntimeConfig {
        savefile_root: root,
        ..RuntimeConfig::default()
    })?;

    let save = rt.open_savefile(Some(&name))?;
    if let Some(cd) = &opt.cd {
        rt.set_variable(save, "cd", Value::string(cd))?;
    }

    match &opt.get {
        Some(key) => {
            let value = rt.savefile_read(save, Some(key))?;
            println!("{}", describe(&mut rt, &value)?);
        }
        None => {
            let dir = rt.get_variable(save, "dir")?;
            let entries = rt.as_list(&dir)?.values(&mut rt)?;
            tracing::debug!(count = entries.len(), "listing directory");
            for entry in entries {
                println!("{}", entry.stringify(&rt));
            }
        }
    }

    // Closing flushes the file if `--cd` created a directory.
    rt.delete(save);
    Ok(())
}

/// One line for a value read back from a savefile. Lists print their elements and hash
/// entries.
fn describe(rt: &mut Runtime, value: &Value) -> dreamrt_vm::Result<String> {
    let list = match rt.try_as_list(value) {
        Some(list) => list,
        None => return Ok(value.stringify(rt)),
    };
    let assoc = list.assoc_entries(rt)?;
    let mut items = vec![];
    for item in list.values(rt)? {
        match assoc.iter().find(|(k, _)| *k == item) {
            Some((_, v)) => items.push(format!("{} = {}", item.stringify(rt), v.stringify(rt))),
            None => items.push(item.stringify(rt)),
        }
    }
    Ok(format!("list({})", items.join(", ")))
}

#[derive(clap::Parser)]
#[clap(about, version, author)]
struct Opt {
    /// The savefile to inspect.
    savefile: PathBuf,

    /// Change to this directory inside the savefile first.
    #[clap(long)]
    cd: Option<String>,

    /// Print the entry under this key instead of listing the directory.
    #[clap(long)]
    get: Option<String>,

    /// Log engine activity to stderr.
    #[clap(short, long)]
    verbose: bool,
}
