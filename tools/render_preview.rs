/// Render Preview — interactive shell for rendering frames across languages.
///
/// Usage: render_preview --data <dir> [--lang <code>] [--frame <file.ron>]
///
/// Commands:
///   lang <code>                          — switch language (starts a new session)
///   load <file.ron>                      — load a frame from RON
///   bio <name> <f|m|n> <prof,..> <nat,..> — define a biography frame
///   render                               — render the current frame in this session
///   all                                  — render the current frame in every language
///   register <neutral|formal>            — set the register hint
///   max <n|none>                         — limit sentences per frame
///   state                                — show the discourse state
///   reset                                — forget all mentions
///   help                                 — list commands
///   quit                                 — exit
///
/// Set RUST_LOG (e.g. `RUST_LOG=realization_engine=debug`) to trace loads
/// and degradations.

use realization_engine::core::discourse::Register;
use realization_engine::core::registry::RonConfigStore;
use realization_engine::schema::entity::{Entity, Gender};
use realization_engine::schema::frame::{BioFrame, Frame};
use realization_engine::{RenderSession, RenderedText, Router};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut data_dir = None;
    let mut lang = "en".to_string();
    let mut frame_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data" if i + 1 < args.len() => {
                i += 1;
                data_dir = Some(PathBuf::from(&args[i]));
            }
            "--lang" if i + 1 < args.len() => {
                i += 1;
                lang = args[i].clone();
            }
            "--frame" if i + 1 < args.len() => {
                i += 1;
                frame_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(data_dir) = data_dir else {
        eprintln!("ERROR: --data <dir> is required");
        std::process::exit(1);
    };

    let router = match Router::builder().data_dir(&data_dir).build() {
        Ok(router) => router,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    let codes: Vec<String> = match RonConfigStore::new(&data_dir).load_profiles() {
        Ok(profiles) => profiles.into_iter().map(|p| p.code).collect(),
        Err(e) => {
            eprintln!("ERROR: failed to load profiles: {}", e);
            std::process::exit(1);
        }
    };

    let mut frame: Option<Frame> = None;
    if let Some(path) = frame_path {
        frame = load_frame(Path::new(&path));
    }

    println!("Loaded {} language profiles: {}", codes.len(), codes.join(", "));
    println!("Language: {}", lang);
    println!("Type 'help' for commands.\n");

    let mut session = RenderSession::new(&router, &lang);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("render[{}]> ", session.lang_code());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "lang" => {
                if parts.len() < 2 {
                    println!("Usage: lang <code>");
                    println!("  Available: {}", codes.join(", "));
                    continue;
                }
                let options = session.options_mut().clone();
                session = RenderSession::new(&router, parts[1]).with_options(options);
                println!("Language set to '{}' (new session).", parts[1]);
            }
            "load" => {
                if parts.len() < 2 {
                    println!("Usage: load <file.ron>");
                    continue;
                }
                if let Some(loaded) = load_frame(Path::new(parts[1])) {
                    frame = Some(loaded);
                    println!("Frame loaded.");
                }
            }
            "bio" => {
                if parts.len() < 5 {
                    println!("Usage: bio <name> <f|m|n> <profession,..> <nationality,..>");
                    println!("  Use '_' inside the name for spaces, '-' for an empty list.");
                    continue;
                }
                frame = Some(Frame::Bio(BioFrame {
                    main_entity: Entity::person(&parts[1].replace('_', " "), parse_gender(parts[2])),
                    profession_lemmas: parse_list(parts[3]),
                    nationality_lemmas: parse_list(parts[4]),
                    birth_event: None,
                    death_event: None,
                }));
                println!("Biography frame defined.");
            }
            "render" | "r" => {
                let Some(current) = frame.as_ref() else {
                    println!("No frame loaded. Use 'load' or 'bio' first.");
                    continue;
                };
                match session.render(current) {
                    Ok(rendered) => print_rendered(&rendered),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "all" => {
                let Some(current) = frame.as_ref() else {
                    println!("No frame loaded. Use 'load' or 'bio' first.");
                    continue;
                };
                let options = session.options_mut().clone();
                for code in &codes {
                    match router.render(current, code, None, &options) {
                        Ok(rendered) => {
                            let flag = if rendered.degraded { " [degraded]" } else { "" };
                            println!("  {:>3}: {}{}", code, rendered.text, flag);
                        }
                        Err(e) => println!("  {:>3}: ERROR: {}", code, e),
                    }
                }
            }
            "register" => {
                let register = match parts.get(1).copied() {
                    Some("formal") => Register::Formal,
                    Some("neutral") => Register::Neutral,
                    _ => {
                        println!("Usage: register <neutral|formal>");
                        continue;
                    }
                };
                session.options_mut().register = register;
                println!("Register set to {:?}.", register);
            }
            "max" => {
                let max = match parts.get(1).copied() {
                    Some("none") => None,
                    Some(n) => match n.parse::<usize>() {
                        Ok(n) => Some(n),
                        Err(_) => {
                            println!("Not a number: {}", n);
                            continue;
                        }
                    },
                    None => {
                        println!("Usage: max <n|none>");
                        continue;
                    }
                };
                session.options_mut().max_sentences = max;
                println!("Max sentences: {:?}", max);
            }
            "state" => {
                let state = session.state();
                println!("  Focus: {:?}", state.current_focus.as_ref().map(|e| &e.0));
                for entity in &state.mentioned {
                    let age = state.recency.get(entity).copied().unwrap_or(0);
                    println!("  {} (last subject {} sentences ago)", entity.0, age);
                }
            }
            "reset" => {
                session.reset();
                println!("Discourse state cleared.");
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn load_frame(path: &Path) -> Option<Frame> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            println!("ERROR: cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match ron::from_str::<Frame>(&contents) {
        Ok(frame) => Some(frame),
        Err(e) => {
            println!("ERROR: invalid frame in {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_gender(s: &str) -> Option<Gender> {
    match s {
        "f" | "female" => Some(Gender::Female),
        "m" | "male" => Some(Gender::Male),
        "n" | "neuter" => Some(Gender::Neuter),
        _ => None,
    }
}

fn parse_list(s: &str) -> Vec<String> {
    if s == "-" {
        return Vec::new();
    }
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn print_rendered(rendered: &RenderedText) {
    println!("\n--- {} ---", rendered.backend);
    println!("{}", rendered.text);
    if rendered.degraded {
        println!("--- degraded ---");
        for diagnostic in &rendered.diagnostics {
            println!("  {}", diagnostic);
        }
    }
    println!();
}

fn print_usage() {
    println!("Usage: render_preview --data <dir> [--lang <code>] [--frame <file.ron>]");
}

fn print_help() {
    println!("Commands:");
    println!("  lang <code>                           switch language (new session)");
    println!("  load <file.ron>                       load a frame from RON");
    println!("  bio <name> <f|m|n> <prof,..> <nat,..> define a biography frame");
    println!("  render                                render in the current session");
    println!("  all                                   render in every language");
    println!("  register <neutral|formal>             set the register hint");
    println!("  max <n|none>                          limit sentences per frame");
    println!("  state                                 show the discourse state");
    println!("  reset                                 forget all mentions");
    println!("  quit                                  exit");
}
