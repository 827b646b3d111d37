//! GJF Editor command-line interface.
//!
//! Thin orchestration over the library core: every command parses the file,
//! consults the keyword knowledge base, applies a mutation and writes the
//! result back, taking a backup first. The commands map one-to-one onto the
//! core contracts:
//!
//! ```bash
//! # Inventory
//! gjfed list [dir]                 # find .gjf files (non-recursive)
//! gjfed show <file>                # sections and their keywords
//! gjfed keywords [category]        # browse the keyword taxonomy
//! gjfed search <query>             # search keywords by name/description
//!
//! # Editing (a backup is created before each write)
//! gjfed check <file> <keyword>     # compatibility check only
//! gjfed add <file> <keyword> [n]   # add keyword to section n (default 1)
//! gjfed remove <file> <keyword> [n]
//! gjfed set-param <file> <keyword> <fragment> [n]
//!
//! # Backups
//! gjfed backups [name]             # list backups, optionally filtered
//! gjfed restore <file>             # restore the most recent backup
//! gjfed init-config                # write a gjfed.cfg template
//! ```
//!
//! Exit code 1 signals any failed operation; compatibility-blocked adds
//! also exit 1 after printing the blocking warnings.

use gjfed::backup::BackupSystem;
use gjfed::io;
use gjfed::keywords::KeywordManager;
use gjfed::parser;
use gjfed::settings::SettingsManager;
use std::env;
use std::path::Path;
use std::process;

fn print_usage(program: &str) {
    eprintln!("GJF Editor - Gaussian input keyword editor");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} list [dir]                          List .gjf files", program);
    eprintln!("  {} show <file>                         Show sections and keywords", program);
    eprintln!("  {} keywords [category]                 Browse the keyword taxonomy", program);
    eprintln!("  {} search <query>                      Search keywords", program);
    eprintln!("  {} check <file> <keyword>              Check keyword compatibility", program);
    eprintln!("  {} add <file> <keyword> [section]      Add a keyword", program);
    eprintln!("  {} remove <file> <keyword> [section]   Remove a keyword", program);
    eprintln!("  {} set-param <file> <kw> <fragment> [section]  Rewrite a parameter", program);
    eprintln!("  {} backups [name|--cleanup]            List or prune backups", program);
    eprintln!("  {} restore <file>                      Restore the latest backup", program);
    eprintln!("  {} init-config                         Create a gjfed.cfg template", program);
}

fn main() {
    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let level = settings
        .logging()
        .level
        .parse()
        .unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "list" => run_list(args.get(2).map(String::as_str)),
        "show" => with_arg(&args, 2, "file", |file| run_show(Path::new(file))),
        "keywords" => run_keywords(&settings, args.get(2).map(String::as_str)),
        "search" => with_arg(&args, 2, "query", |query| run_search(&settings, query)),
        "check" => match (args.get(2), args.get(3)) {
            (Some(file), Some(keyword)) => run_check(&settings, Path::new(file), keyword),
            _ => usage_error(&args[0], "check needs <file> <keyword>"),
        },
        "add" => match (args.get(2), args.get(3)) {
            (Some(file), Some(keyword)) => {
                run_add(&settings, Path::new(file), keyword, section_arg(&args, 4))
            }
            _ => usage_error(&args[0], "add needs <file> <keyword>"),
        },
        "remove" => match (args.get(2), args.get(3)) {
            (Some(file), Some(keyword)) => {
                run_remove(&settings, Path::new(file), keyword, section_arg(&args, 4))
            }
            _ => usage_error(&args[0], "remove needs <file> <keyword>"),
        },
        "set-param" => match (args.get(2), args.get(3), args.get(4)) {
            (Some(file), Some(keyword), Some(fragment)) => run_set_param(
                &settings,
                Path::new(file),
                keyword,
                fragment,
                section_arg(&args, 5),
            ),
            _ => usage_error(&args[0], "set-param needs <file> <keyword> <fragment>"),
        },
        "backups" => run_backups(&settings, args.get(2).map(String::as_str)),
        "restore" => with_arg(&args, 2, "file", |file| {
            run_restore(&settings, Path::new(file))
        }),
        "init-config" => SettingsManager::create_template(Path::new("gjfed.cfg"))
            .map(|()| println!("Created gjfed.cfg"))
            .map_err(|e| e.to_string()),
        "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        other => usage_error(&args[0], &format!("unknown command: {}", other)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

type CmdResult = Result<(), String>;

fn with_arg(
    args: &[String],
    index: usize,
    name: &str,
    f: impl FnOnce(&str) -> CmdResult,
) -> CmdResult {
    match args.get(index) {
        Some(value) => f(value),
        None => Err(format!("missing <{}> argument", name)),
    }
}

fn usage_error(program: &str, message: &str) -> CmdResult {
    print_usage(program);
    Err(message.to_string())
}

/// Optional 1-based section argument; defaults to section 1.
fn section_arg(args: &[String], index: usize) -> usize {
    args.get(index)
        .and_then(|s| s.parse::<usize>().ok())
        .map(|n| n.saturating_sub(1))
        .unwrap_or(0)
}

fn load_manager(settings: &SettingsManager) -> Result<KeywordManager, String> {
    let keywords_dir = &settings.data().keywords_dir;
    let result = if keywords_dir.is_empty() {
        KeywordManager::builtin()
    } else {
        KeywordManager::load(Path::new(keywords_dir))
    };
    result.map_err(|e| e.to_string())
}

fn open_backup_system(settings: &SettingsManager) -> Result<BackupSystem, String> {
    BackupSystem::new(&settings.backup().directory).map_err(|e| e.to_string())
}

fn run_list(dir: Option<&str>) -> CmdResult {
    let dir = Path::new(dir.unwrap_or("."));
    let files = parser::find_all_gjf_files(dir).map_err(|e| e.to_string())?;

    if files.is_empty() {
        println!("No .gjf files found in {}", dir.display());
        return Ok(());
    }

    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}

fn run_show(path: &Path) -> CmdResult {
    let sections = parser::parse_file(path).map_err(|e| e.to_string())?;

    println!("{}: {} section(s)", path.display(), sections.len());
    for section in &sections {
        println!();
        println!(
            "Section {} (lines {}-{}){}:",
            section.section_number + 1,
            section.start_line + 1,
            section.end_line,
            if section.is_link_section { " [Link]" } else { "" }
        );

        match &section.keyword_section {
            Some(ks) => {
                println!("  type: {}", ks.section_type);
                println!("  directive (line {}): {}", ks.line_number, ks.original_line);
                for kw in &ks.keywords {
                    match ks.parameters.get(kw) {
                        Some(fragment) => println!("    {} -> {}", kw, fragment),
                        None => println!("    {}", kw),
                    }
                }
            }
            None => println!("  no #p directive line"),
        }
    }
    Ok(())
}

fn run_keywords(settings: &SettingsManager, category: Option<&str>) -> CmdResult {
    let manager = load_manager(settings)?;

    match category {
        Some(category_id) => {
            let keywords = manager.keywords_by_category(category_id);
            if keywords.is_empty() {
                return Err(format!("no keywords in category '{}'", category_id));
            }
            for info in keywords {
                let params = if info.requires_parameters {
                    " (takes parameters)"
                } else {
                    ""
                };
                println!("{:<22} {}{}", info.name, info.description, params);
            }
        }
        None => {
            println!("Categories:");
            for (id, name) in manager.all_categories() {
                println!("  {:<18} {}", id, name);
            }
            println!();
            println!("Run `gjfed keywords <category>` to list its keywords.");
        }
    }
    Ok(())
}

fn run_search(settings: &SettingsManager, query: &str) -> CmdResult {
    let manager = load_manager(settings)?;
    let hits = manager.search_keywords(query, None);

    if hits.is_empty() {
        println!("No keywords matching '{}'", query);
        return Ok(());
    }

    for info in hits {
        println!("{:<22} [{}] {}", info.name, info.category, info.description);
    }
    Ok(())
}

/// Returns the decoded directive of the requested section, failing with a
/// readable message when the section is absent or has no directive.
fn directive_keywords(
    sections: &[parser::GjfSection],
    section_index: usize,
) -> Result<Vec<String>, String> {
    let section = sections
        .get(section_index)
        .ok_or_else(|| format!("file has no section {}", section_index + 1))?;
    section
        .keyword_section
        .as_ref()
        .map(|ks| ks.keywords.clone())
        .ok_or_else(|| format!("section {} has no #p directive line", section_index + 1))
}

fn run_check(settings: &SettingsManager, path: &Path, keyword: &str) -> CmdResult {
    let manager = load_manager(settings)?;
    let sections = parser::parse_file(path).map_err(|e| e.to_string())?;
    let existing = directive_keywords(&sections, 0)?;

    let (ok, warnings) = manager.check_compatibility(&existing, keyword);
    for warning in &warnings {
        println!("  {}", warning);
    }
    if ok {
        println!("'{}' is compatible with: {}", keyword, existing.join(" "));
        Ok(())
    } else {
        Err(format!("'{}' is not compatible with this directive", keyword))
    }
}

fn save_with_backup(
    settings: &SettingsManager,
    path: &Path,
    sections: &[parser::GjfSection],
) -> CmdResult {
    let backup_system = open_backup_system(settings)?;
    let backup_path = backup_system.create_backup(path).map_err(|e| e.to_string())?;

    io::write_lines(path, &io::reassemble(sections)).map_err(|e| e.to_string())?;
    println!("Saved {} (backup: {})", path.display(), backup_path.display());
    Ok(())
}

fn run_add(
    settings: &SettingsManager,
    path: &Path,
    keyword: &str,
    section_index: usize,
) -> CmdResult {
    let manager = load_manager(settings)?;
    let mut sections = parser::parse_file(path).map_err(|e| e.to_string())?;
    let existing = directive_keywords(&sections, section_index)?;

    if existing.iter().any(|kw| kw == keyword) {
        println!("'{}' is already present", keyword);
        return Ok(());
    }

    let (ok, warnings) = manager.check_compatibility(&existing, keyword);
    for warning in &warnings {
        println!("  {}", warning);
    }
    if !ok {
        return Err(format!("'{}' is not compatible with this directive", keyword));
    }

    let mut new_keywords = existing;
    new_keywords.push(keyword.to_string());
    parser::update_keyword_section(&mut sections[section_index], &new_keywords);

    save_with_backup(settings, path, &sections)
}

fn run_remove(
    settings: &SettingsManager,
    path: &Path,
    keyword: &str,
    section_index: usize,
) -> CmdResult {
    let mut sections = parser::parse_file(path).map_err(|e| e.to_string())?;
    let existing = directive_keywords(&sections, section_index)?;

    if !existing.iter().any(|kw| kw == keyword) {
        return Err(format!("'{}' is not present in the directive", keyword));
    }

    let new_keywords: Vec<String> = existing.into_iter().filter(|kw| kw != keyword).collect();
    parser::update_keyword_section(&mut sections[section_index], &new_keywords);

    save_with_backup(settings, path, &sections)
}

fn run_set_param(
    settings: &SettingsManager,
    path: &Path,
    keyword: &str,
    fragment: &str,
    section_index: usize,
) -> CmdResult {
    let mut sections = parser::parse_file(path).map_err(|e| e.to_string())?;
    let existing = directive_keywords(&sections, section_index)?;

    if !existing.iter().any(|kw| kw == keyword) {
        return Err(format!("'{}' is not present in the directive", keyword));
    }

    parser::update_keyword_parameter(&mut sections[section_index], keyword, fragment);

    save_with_backup(settings, path, &sections)
}

fn run_backups(settings: &SettingsManager, name: Option<&str>) -> CmdResult {
    let backup_system = open_backup_system(settings)?;

    if name == Some("--cleanup") {
        let removed = backup_system.cleanup_old_backups(settings.backup().keep_last_n);
        println!(
            "Removed {} backup(s), kept the {} most recent",
            removed.len(),
            settings.backup().keep_last_n
        );
        return Ok(());
    }

    let backups = backup_system.backup_files(name);

    if backups.is_empty() {
        println!("No backups found");
        return Ok(());
    }

    for backup in &backups {
        println!("{}", backup.display());
    }

    let info = backup_system.backup_info();
    println!();
    println!(
        "{} backup(s), {} bytes in {}",
        info.total_backups,
        info.disk_usage_bytes,
        info.backup_dir.display()
    );
    Ok(())
}

fn run_restore(settings: &SettingsManager, path: &Path) -> CmdResult {
    let backup_system = open_backup_system(settings)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| format!("invalid file name: {}", path.display()))?;

    let backup = backup_system
        .latest_backup(&stem)
        .ok_or_else(|| format!("no backups found for '{}'", stem))?;

    backup_system
        .restore_backup(&backup, path, true)
        .map_err(|e| e.to_string())?;
    println!("Restored {} from {}", path.display(), backup.display());
    Ok(())
}
