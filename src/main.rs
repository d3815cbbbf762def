mod commands;
mod commit;
mod delta;
mod errors;
mod object;
mod pack;
mod repo;
mod store;
mod tree;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty Git repository
    Init {
        /// Directory to initialize instead of the current one
        #[arg(id = "directory")]
        dir: Option<PathBuf>,
    },

    /// Provide content or type and size information for repository objects
    CatFile {
        /// Show object type
        #[arg(short, conflicts_with_all = ["size_only", "exists", "pretty_print"])]
        type_only: bool,

        /// Show object size
        #[arg(short, conflicts_with_all = ["type_only", "exists", "pretty_print"])]
        size_only: bool,

        /// Check object existence; exit status is the answer
        #[arg(short, conflicts_with_all = ["type_only", "size_only", "pretty_print"])]
        exists: bool,

        /// Pretty-print object's content
        #[arg(short, conflicts_with_all = ["size_only", "type_only", "exists"])]
        pretty_print: bool,

        /// Object hash
        #[arg(id = "object")]
        hash: String,
    },

    /// Compute object ID and optionally create an object from a file
    HashObject {
        /// Actually write the object into the object database
        #[arg(short)]
        write: bool,

        /// Read the object from standard input instead of a file
        #[arg(long, conflicts_with = "file")]
        stdin: bool,

        #[arg(id = "file", required_unless_present = "stdin")]
        file: Option<PathBuf>,
    },

    /// List the contents of a tree object
    LsTree {
        /// Show object size of blob entries
        #[arg(short = 'l', conflicts_with_all = ["name_only", "object_only"])]
        long: bool,

        /// List only file names
        #[arg(long, conflicts_with = "object_only")]
        name_only: bool,

        /// List only object hashes
        #[arg(long)]
        object_only: bool,

        /// Tree hash
        #[arg(id = "tree-ish")]
        hash: String,
    },

    /// Create a tree object from the current working directory
    WriteTree,

    /// Create a new commit object
    CommitTree {
        /// Tree hash
        #[arg(id = "tree")]
        tree: String,

        /// Parent commit hash (may be given more than once)
        #[arg(short, id = "parent")]
        parents: Vec<String>,

        /// Commit message; read from stdin when omitted
        #[arg(short, id = "message")]
        message: Option<String>,
    },

    /// Unpack objects from a packfile into the object database
    UnpackObjects {
        /// Packfile to read; standard input when omitted
        #[arg(id = "pack-file")]
        pack: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::from(128)
        }
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    match args.command {
        Commands::Init { dir } => commands::init::invoke(dir.as_deref()),
        Commands::CatFile {
            type_only,
            size_only,
            exists,
            pretty_print: _,
            hash,
        } => commands::cat_file::invoke(&hash, type_only, size_only, exists),
        Commands::HashObject { write, stdin, file } => {
            commands::hash_object::invoke(file.as_deref(), stdin, write)
        }
        Commands::LsTree {
            long,
            name_only,
            object_only,
            hash,
        } => commands::ls_tree::invoke(&hash, long, name_only, object_only),
        Commands::WriteTree => commands::write_tree::invoke(),
        Commands::CommitTree {
            tree,
            parents,
            message,
        } => {
            let message = match message {
                Some(message) => message,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .lock()
                        .read_to_string(&mut buf)
                        .context("reading commit message from stdin")?;
                    buf
                }
            };
            commands::commit_tree::invoke(&tree, &parents, &message)
        }
        Commands::UnpackObjects { pack } => commands::unpack_objects::invoke(pack.as_deref()),
    }
}
