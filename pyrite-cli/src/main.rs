use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use pyrite_compiler::builtins::{sys_set_argv, sys_set_executable};
use pyrite_compiler::{advance_module_phase, debug_flag_for_name, GlobalContext, Phase};
use pyrite_diagnostics::report;

#[derive(Parser)]
#[command(name = "pyrite")]
#[command(version)]
#[command(about = "Pyrite ahead-of-time compiler", long_about = None)]
#[command(after_help = "\
All arguments after a filename, -c option, or -m option are not parsed;\n\
instead, they are available to the program in sys.argv.\n\
\n\
The interactive shell is not implemented. Either a filename, the -c\n\
option, or the -m option must be given.")]
struct Cli {
    /// Run the given code instead of loading from a file
    #[arg(short = 'c', value_name = "CODE", conflicts_with_all = ["module", "file"])]
    code: Option<String>,

    /// Find the given module on the search paths and run it
    #[arg(short = 'm', value_name = "MODULE", conflicts_with = "file")]
    module: Option<String>,

    /// Enable debug flags (comma-separated; may be used multiple times)
    #[arg(short = 'X', value_name = "FLAG[,FLAG]", action = clap::ArgAction::Append)]
    debug: Vec<String>,

    /// Prepend an import search root
    #[arg(short = 'A', value_name = "PATH", action = clap::ArgAction::Append)]
    import_path: Vec<String>,

    /// Source file to run
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Arguments passed to the program in sys.argv
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    // clap has no spelling for the -? alias
    if std::env::args().any(|arg| arg == "-?") {
        use clap::CommandFactory;
        Cli::command().print_help().context("can't print usage")?;
        return Ok(ExitCode::SUCCESS);
    }

    let cli = Cli::parse();

    // -A roots take priority over the working directory, in the order given
    let mut import_paths = vec![".".to_string()];
    for (index, path) in cli.import_path.iter().enumerate() {
        import_paths.insert(index, path.clone());
    }

    let mut global = GlobalContext::new(import_paths);
    for group in &cli.debug {
        for name in group.split(',') {
            global.debug_flags |= debug_flag_for_name(name);
        }
    }

    let executable = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    sys_set_executable(&mut global, &executable);

    // work out what to run and what sys.argv[0] should be
    let (module_spec, spec_is_code, mut sys_argv) = if let Some(code) = &cli.code {
        (code.clone(), true, vec!["-c".to_string()])
    } else if let Some(module_name) = &cli.module {
        let found = global
            .find_source_file(module_name)
            .with_context(|| format!("can't run module {}", module_name))?;
        (found.clone(), false, vec![found])
    } else if let Some(file) = &cli.file {
        let filename = file.display().to_string();
        (filename.clone(), false, vec![filename])
    } else {
        anyhow::bail!("either a filename, -c, or -m must be given");
    };
    sys_argv.extend(cli.args.iter().cloned());
    sys_set_argv(&mut global, sys_argv);

    log::info!(
        "compiling __main__ from {}",
        if spec_is_code { "<code>" } else { &module_spec }
    );

    let module = global
        .get_or_create_module("__main__", Some(&module_spec), spec_is_code)
        .with_context(|| format!("can't load {}", module_spec))?;

    // compile errors already carry their rendered source context; print
    // them directly and set the exit code, without anyhow's chain
    match advance_module_phase(&mut global, &module, Phase::Imported) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}
