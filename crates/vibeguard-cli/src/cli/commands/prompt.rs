use super::super::args::PromptArgs;
use super::load_or_report;
use crate::exit_codes;
use vibeguard_core::model::BUILTIN_INIT_PROMPT;

pub(crate) fn run(args: PromptArgs) -> anyhow::Result<i32> {
    // `prompt init` must work before any manifest exists; it is the
    // bootstrap path for writing one.
    let manifest = match load_or_report(&args.config) {
        Ok(m) => m,
        Err(code) => {
            if args.id.as_deref() == Some("init") {
                print!("{}", BUILTIN_INIT_PROMPT);
                return Ok(exit_codes::SUCCESS);
            }
            return Ok(code);
        }
    };

    match &args.id {
        Some(id) => match manifest.prompt_content(id) {
            Some(content) => {
                print!("{}", content);
                if !content.ends_with('\n') {
                    println!();
                }
                Ok(exit_codes::SUCCESS)
            }
            None => {
                eprintln!("error: unknown prompt '{}'", id);
                Ok(exit_codes::CONFIG_ERROR)
            }
        },
        None => {
            if args.json {
                let entries: Vec<serde_json::Value> = manifest
                    .prompts
                    .iter()
                    .map(|(id, p)| {
                        serde_json::json!({
                            "id": id,
                            "description": p.description,
                            "tags": p.tags,
                            "content": p.content,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (id, p) in &manifest.prompts {
                    match (&p.description, args.verbose) {
                        (_, true) => {
                            println!("{}:", id);
                            for line in p.content.lines() {
                                println!("  {}", line);
                            }
                        }
                        (Some(desc), false) => println!("{:<24} {}", id, desc),
                        (None, false) => println!("{}", id),
                    }
                }
            }
            Ok(exit_codes::SUCCESS)
        }
    }
}
