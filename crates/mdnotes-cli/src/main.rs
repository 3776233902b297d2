use std::{
    fs,
    io::{self, BufRead, Read, Write},
    path::{Path, PathBuf},
};

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use strum::IntoEnumIterator;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mdnotes_markup::{DocumentRenderer, LatexToHtml, MathDisplay, RenderConfig, Replacer};
use mdnotes_sync::{
    NoteError, NoteStore, SettingKey, SettingsStore, SyncError, SyncSettings, Syncer, import_image,
};

mod config_file;

use config_file::{ConfigError, load_config_file};

/// Renders markdown notes with math and syncs them to a WebDAV server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a markdown note to an HTML document
    Render {
        /// The markdown file to render, or "-" for stdin
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Write the HTML here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// TOML file with font and color settings
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Sets the custom delimiter for inline formulas
        #[arg(
            long,
            default_value = "$",
            value_name = "STR",
            value_parser = NonEmptyStringValueParser::new()
        )]
        inline_del: String,

        /// Sets the custom delimiter for block formulas
        #[arg(
            long,
            default_value = "$$",
            value_name = "STR",
            value_parser = NonEmptyStringValueParser::new()
        )]
        block_del: String,

        /// If true, delimiters are ignored that are preceded by a backslash
        #[arg(long)]
        ignore_escaped_delim: bool,
    },

    /// Convert a single formula to HTML
    Math {
        /// Specifies the formula; read from stdin when missing
        #[arg(short, long)]
        formula: Option<String>,

        /// Wrap the formula as an inline span (the default)
        #[arg(short, long, group = "mode")]
        inline: bool,

        /// Wrap the formula as a centered block
        #[arg(short, long, group = "mode")]
        block: bool,

        /// TOML file with font and color settings
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Upload the resource directory to the configured WebDAV server
    Sync {
        /// Directory with one folder per note
        #[arg(long, default_value = "resources", value_name = "DIR")]
        resources: PathBuf,

        /// Settings file to use instead of the default one
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Change the stored WebDAV settings
    Configure {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,

        /// Remote directory, relative to the URL
        #[arg(long)]
        remote_path: Option<String>,

        /// Settings file to use instead of the default one
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },

    /// Print the stored WebDAV settings
    ShowConfig {
        /// Settings file to use instead of the default one
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },

    /// List the notes, or the documents of one note
    Notes {
        /// Note whose markdown and PDF documents to list
        note: Option<String>,

        /// Directory with one folder per note
        #[arg(long, default_value = "resources", value_name = "DIR")]
        resources: PathBuf,
    },

    /// Copy an image into the assets folder next to a markdown file
    AddImage {
        /// The markdown file the image belongs to
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// The image to copy
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Append the image link to the markdown file instead of printing it
        #[arg(long)]
        append: bool,
    },
}

fn main() {
    init_logging();
    let args = Args::parse();
    match args.command {
        Command::Render {
            file,
            output,
            config,
            inline_del,
            block_del,
            ignore_escaped_delim,
        } => {
            let replacer = Replacer::new(
                (&inline_del, &inline_del),
                (&block_del, &block_del),
                ignore_escaped_delim,
            );
            let renderer =
                DocumentRenderer::new(render_config(config.as_deref())).with_replacer(replacer);
            let input = match file {
                Some(ref fpath) if fpath != Path::new("-") => {
                    fs::read_to_string(fpath).unwrap_or_else(|e| exit_io_error(e, Some(fpath)))
                }
                _ => read_stdin(),
            };
            let html = renderer.render(&input);
            match output {
                Some(ref fpath) => {
                    fs::write(fpath, html).unwrap_or_else(|e| exit_io_error(e, Some(fpath)))
                }
                None => print!("{}", html),
            }
        }
        Command::Math {
            formula,
            inline: _,
            block,
            config,
        } => {
            let display = if block {
                MathDisplay::Block
            } else {
                MathDisplay::Inline
            };
            let latex = formula.unwrap_or_else(read_stdin);
            let converter = LatexToHtml::new(render_config(config.as_deref()));
            println!("{}", converter.render(latex.trim(), display));
        }
        Command::Sync {
            resources,
            settings,
            yes,
        } => sync(&resources, settings.as_deref(), yes),
        Command::Configure {
            url,
            username,
            password,
            remote_path,
            settings,
        } => {
            let mut store = open_store(settings.as_deref());
            let mut current = SyncSettings::load(&store);
            if let Some(url) = url {
                current.url = url;
            }
            if let Some(username) = username {
                current.username = username;
            }
            if let Some(password) = password {
                current.password = password;
            }
            if let Some(remote_path) = remote_path {
                current.remote_path = remote_path;
            }
            current.store(&mut store);
            store.save().unwrap_or_else(|e| exit_settings_error(e));
            if let Some(path) = store.path() {
                println!("Settings saved to '{}'", path.display());
            }
        }
        Command::ShowConfig { settings } => {
            let store = open_store(settings.as_deref());
            let current = SyncSettings::load(&store);
            for key in SettingKey::iter() {
                let value = match key {
                    SettingKey::Password if !current.password.is_empty() => "********",
                    _ => current.get(key),
                };
                println!("{} = {:?}", key.as_str(), value);
            }
            if !current.is_configured() {
                println!("(sync is not configured)");
            }
        }
        Command::Notes { note, resources } => {
            let store = NoteStore::open(resources).unwrap_or_else(|e| exit_note_error(e));
            match note {
                Some(note) => {
                    let documents = store
                        .documents(&note)
                        .unwrap_or_else(|e| exit_note_error(e));
                    for document in documents {
                        println!("{}\t{}", document.kind.as_str(), document.name);
                    }
                }
                None => {
                    for note in store.notes().unwrap_or_else(|e| exit_note_error(e)) {
                        println!("{}", note);
                    }
                }
            }
        }
        Command::AddImage {
            file,
            image,
            append,
        } => {
            let imported = import_image(&file, &image).unwrap_or_else(|e| exit_note_error(e));
            debug!(path = %imported.path.display(), "copied image");
            if append {
                let mut markdown = fs::OpenOptions::new()
                    .append(true)
                    .open(&file)
                    .unwrap_or_else(|e| exit_io_error(e, Some(&file)));
                writeln!(markdown, "\n{}", imported.link)
                    .unwrap_or_else(|e| exit_io_error(e, Some(&file)));
            } else {
                println!("{}", imported.link);
            }
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn sync(resources: &Path, settings: Option<&Path>, yes: bool) {
    let store = open_store(settings);
    let settings = SyncSettings::load(&store);
    let target = format!("{}{}", settings.url, settings.remote_path);
    let mut syncer =
        Syncer::from_settings(settings, resources).unwrap_or_else(|e| exit_sync_error(e));
    if !yes && !confirm(&format!("Upload local notes to {target}?")) {
        println!("Sync cancelled.");
        return;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| exit_io_error(e, None));
    match runtime.block_on(syncer.sync()) {
        Ok(report) => {
            println!("{}", report);
            for failure in &report.failures {
                eprintln!(
                    "  '{}' -> {}: {}",
                    failure.local_path.display(),
                    failure.remote_path,
                    failure.outcome
                );
            }
            if !report.is_clean() {
                std::process::exit(2);
            }
        }
        Err(e) if !e.is_failure() => println!("No files found to sync."),
        Err(e) => exit_sync_error(e),
    }
}

fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if let Err(e) = io::stdout().flush() {
        exit_io_error(e, None);
    }
    let mut answer = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut answer) {
        exit_io_error(e, None);
    }
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes")
}

fn open_store(path: Option<&Path>) -> SettingsStore {
    let store = match path {
        Some(path) => SettingsStore::open(path),
        None => SettingsStore::open_default(),
    };
    let store = store.unwrap_or_else(|e| exit_settings_error(e));
    if let Some(path) = store.path() {
        debug!(path = %path.display(), "using settings file");
    }
    store
}

fn render_config(path: Option<&Path>) -> RenderConfig {
    match path {
        Some(path) => {
            load_config_file(path)
                .unwrap_or_else(|e| exit_config_error(e))
                .render
        }
        None => RenderConfig::default(),
    }
}

fn read_stdin() -> String {
    let mut buffer = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buffer) {
        exit_io_error(e, None);
    }
    buffer
}

fn exit_io_error(e: io::Error, fp: Option<&Path>) -> ! {
    eprint!("IO Error");
    if let Some(fp) = fp {
        eprint!(" in '{}'", fp.display());
    }
    eprintln!(": {}", e);
    std::process::exit(1);
}

fn exit_config_error(e: ConfigError) -> ! {
    eprintln!("Config error: {}", e);
    std::process::exit(1);
}

fn exit_settings_error(e: mdnotes_sync::SettingsError) -> ! {
    eprintln!("Settings error: {}", e);
    std::process::exit(1);
}

fn exit_note_error(e: NoteError) -> ! {
    eprintln!("Note error: {}", e);
    std::process::exit(1);
}

fn exit_sync_error(e: SyncError) -> ! {
    eprintln!("Sync error: {}", e);
    if matches!(e, SyncError::NotConfigured) {
        eprintln!("Run `mdnotes configure --url URL --username NAME --password PASS` first.");
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn sync_defaults() {
        let args = Args::parse_from(["mdnotes", "sync"]);
        let Command::Sync {
            resources,
            settings,
            yes,
        } = args.command
        else {
            panic!("expected sync");
        };
        assert_eq!(resources, PathBuf::from("resources"));
        assert!(settings.is_none());
        assert!(!yes);
    }

    #[test]
    fn notes_defaults() {
        let args = Args::parse_from(["mdnotes", "notes", "Physics"]);
        let Command::Notes { note, resources } = args.command else {
            panic!("expected notes");
        };
        assert_eq!(note.as_deref(), Some("Physics"));
        assert_eq!(resources, PathBuf::from("resources"));
    }

    #[test]
    fn add_image_needs_file_and_image() {
        assert!(Args::try_parse_from(["mdnotes", "add-image", "n.md"]).is_err());
        let args = Args::parse_from(["mdnotes", "add-image", "n.md", "a.png", "--append"]);
        let Command::AddImage {
            file,
            image,
            append,
        } = args.command
        else {
            panic!("expected add-image");
        };
        assert_eq!(file, PathBuf::from("n.md"));
        assert_eq!(image, PathBuf::from("a.png"));
        assert!(append);
    }

    #[test]
    fn math_modes_conflict() {
        assert!(Args::try_parse_from(["mdnotes", "math", "-f", "x", "--inline", "--block"]).is_err());
    }

    #[test]
    fn empty_delimiters_are_rejected() {
        assert!(Args::try_parse_from(["mdnotes", "render", "--inline-del", ""]).is_err());
        assert!(Args::try_parse_from(["mdnotes", "render", "--block-del", ""]).is_err());
        assert!(Args::try_parse_from(["mdnotes", "render", "--inline-del", "%"]).is_ok());
    }

    #[test]
    fn render_with_custom_delimiters() {
        let text = r#"
Let us consider a sphere of radius $R$ centered at the origin, then the equation of its surface is
$$x^2 + y^2 + z^2 = R^2$$

For the unit circle we get %x^2 + y^2 = 1% instead, with area $\pi$.
"#;
        let replacer = Replacer::new(("%", "%"), ("$$", "$$"), false);
        let html = DocumentRenderer::new(RenderConfig::default())
            .with_replacer(replacer)
            .render(text);
        assert!(html.contains("radius $R$"));
        assert!(html.contains("x² + y² + z² = R²</div>"));
        assert!(html.contains("x² + y² = 1</span>"));
    }
}
