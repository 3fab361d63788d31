// Entry point and high-level CLI flow.
//
// - Option [1] loads the institutions table and rebuilds the aggregates.
// - Option [2] prints the chart series, writes the reports and checks the
//   table against the map layer.
// - Option [3] opens the admin editor on the same file.
// The `summary`, `export` and `edit` subcommands run one action directly.
mod args;

use args::{Args, Command};
use certa_dashboard::dashboard::Dashboard;
use certa_dashboard::editor::{EditCommand, Editor};
use certa_dashboard::geo::{self, FillStyle};
use certa_dashboard::reports::{generate_summary, summary_headline};
use certa_dashboard::types::Field;
use certa_dashboard::util::format_count;
use certa_dashboard::{output, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

struct App {
    args: Args,
    dashboard: Dashboard,
    editor: Option<Editor>,
}

impl App {
    fn out_path(&self, file: &str) -> PathBuf {
        Path::new(&self.args.out_dir).join(file)
    }
}

/// Print `prompt` and read one trimmed line. `None` once stdin is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_choice() -> Option<String> {
    read_line("Enter choice: ")
}

/// Handle option [1]: load the CSV and rebuild the aggregates.
///
/// A failed load leaves whatever was loaded before in place.
fn handle_load(app: &mut App) {
    match app.dashboard.reload(&app.args.data) {
        Ok(state) => {
            println!(
                "Processing dataset... ({} rows loaded, {} municipalities)",
                format_count(state.report.total_rows),
                format_count(state.aggregates.by_municipio.len())
            );
            if state.report.missing_municipio > 0 {
                println!(
                    "Note: {} rows have no municipality and only count towards the type totals.",
                    format_count(state.report.missing_municipio)
                );
            }
            if state.report.unknown_regiao > 0 {
                println!(
                    "Note: {} rows have a region outside the six known regions.",
                    format_count(state.report.unknown_regiao)
                );
            }
            println!();
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: chart series, report files and map coverage.
fn handle_generate_reports(app: &App) {
    let Some(state) = app.dashboard.state() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let aggs = &state.aggregates;

    output::preview_table("Atendimentos por tipo", None, &aggs.type_series(), 3);
    output::preview_table(
        "Atendimentos por região",
        Some("Only rows whose region matches exactly"),
        &aggs.region_series(),
        6,
    );

    let table = aggs.municipio_table();
    let file1 = app.out_path("municipio_totals.csv");
    if let Err(e) = output::write_csv(&file1, &table) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table("Municípios", Some("Top 10 by total"), &table, 10);
    println!("(Full table exported to {})\n", file1.display());

    let file2 = app.out_path("aggregates.json");
    if let Err(e) = output::write_json(&file2, aggs) {
        eprintln!("Write error: {}", e);
    }

    match geo::load_geojson(&app.args.geojson) {
        Ok(layer) => {
            let styles = layer.styles(aggs);
            let with_data = styles
                .iter()
                .filter(|s| s.fill == FillStyle::HasData)
                .count();
            println!(
                "Map: {} of {} features have data.",
                format_count(with_data),
                format_count(styles.len())
            );
            let unmatched = layer.unmatched_keys(aggs);
            if !unmatched.is_empty() {
                println!("Not on the map: {}\n", unmatched.join(", "));
            }
        }
        Err(e) => warn!("Map layer unavailable: {}", e),
    }

    let summary = generate_summary(&state.rows, aggs, Utc::now());
    if let Err(e) = output::write_json(&app.out_path("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!("{}\n", summary_headline(&summary));
}

fn open_editor(args: &Args) -> Editor {
    let names = match geo::load_geojson(&args.geojson) {
        Ok(layer) => layer.municipio_names(),
        Err(e) => {
            warn!("No municipality suggestions: {}", e);
            Vec::new()
        }
    };
    let mut editor = Editor::with_municipios(names);
    match editor.load(&args.data) {
        Ok(n) => info!("Editor opened with {} rows", n),
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
    editor
}

fn export_editor(editor: &Editor, path: &Path) -> Result<()> {
    let text = editor.export_csv();
    output::write_text(path, &text)?;
    println!("Exported {} rows to {}\n", format_count(editor.rows().len()), path.display());
    Ok(())
}

fn list_rows(editor: &Editor) {
    output::preview_table("Instituições", None, &editor.table_rows(), usize::MAX);
    let unknown = editor.unknown_municipios();
    if !unknown.is_empty() {
        let idx: Vec<String> = unknown.iter().map(|i| i.to_string()).collect();
        println!("Rows with a municipality not on the map: {}\n", idx.join(", "));
    }
}

fn read_index(editor: &Editor) -> Option<usize> {
    let raw = read_line("Row number: ")?;
    match raw.parse::<usize>() {
        Ok(i) => Some(i),
        Err(_) => {
            println!("Invalid row number. There are {} rows.\n", editor.rows().len());
            None
        }
    }
}

fn read_edit_command(editor: &Editor) -> Option<EditCommand> {
    let index = read_index(editor)?;
    let field: Field = match read_line("Field (e.g. Municipio, Regiao, Qt_Servicos): ")?.parse() {
        Ok(f) => f,
        Err(e) => {
            println!("{}\n", e);
            return None;
        }
    };
    let value = read_line("Value: ")?;
    Some(EditCommand::SetField {
        index,
        field,
        value,
    })
}

/// Option [3]: the admin table. Returns `false` once stdin is closed.
fn editor_menu(app: &mut App) -> bool {
    let args = app.args.clone();
    let out = app.out_path("instituicoes.csv");
    let editor = app.editor.get_or_insert_with(|| open_editor(&args));
    loop {
        println!("Editor ({} rows):", editor.rows().len());
        println!("[1] List rows");
        println!("[2] Add row");
        println!("[3] Edit a field");
        println!("[4] Delete a row");
        println!("[5] Import a CSV file");
        println!("[6] Export CSV");
        println!("[0] Back\n");
        let Some(choice) = read_choice() else { return false };
        let cmd = match choice.as_str() {
            "1" => {
                list_rows(editor);
                None
            }
            "2" => Some(EditCommand::AddRow),
            "3" => read_edit_command(editor),
            "4" => read_index(editor).map(|index| EditCommand::DeleteRow { index }),
            "5" => {
                if let Some(path) = read_line("File path: ") {
                    match editor.load(&path) {
                        Ok(n) => println!("Imported {} rows.\n", format_count(n)),
                        Err(e) => eprintln!("Import failed: {}\n", e),
                    }
                }
                None
            }
            "6" => {
                if let Err(e) = export_editor(editor, &out) {
                    eprintln!("Export failed: {}\n", e);
                }
                None
            }
            "0" => return true,
            _ => {
                println!("Invalid choice. Please enter 0 to 6.\n");
                None
            }
        };
        if let Some(cmd) = cmd {
            if let Err(e) = editor.apply(cmd) {
                println!("{}\n", e);
            }
        }
    }
}

fn run_command(app: &mut App, command: Command) {
    match command {
        Command::Summary => {
            handle_load(app);
            handle_generate_reports(app);
        }
        Command::Export { output: target } => {
            let path = target
                .map(PathBuf::from)
                .unwrap_or_else(|| app.out_path("instituicoes.csv"));
            let mut editor = Editor::new();
            match editor.load(&app.args.data) {
                Ok(_) => {
                    if let Err(e) = export_editor(&editor, &path) {
                        eprintln!("Export failed: {}", e);
                    }
                }
                Err(e) => eprintln!("Failed to load file: {}", e),
            }
        }
        Command::Edit => {
            editor_menu(app);
        }
    }
}

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    info!("args: {:?}", args);

    let mut app = App {
        args: args.clone(),
        dashboard: Dashboard::new(),
        editor: None,
    };
    if let Some(command) = args.command {
        run_command(&mut app, command);
        return;
    }

    loop {
        println!("Select an action:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Open the editor\n");
        let Some(choice) = read_choice() else { break };
        match choice.as_str() {
            "1" => handle_load(&mut app),
            "2" => {
                println!();
                handle_generate_reports(&app);
            }
            "3" => {
                if !editor_menu(&mut app) {
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
    println!("Exiting the program.");
}
