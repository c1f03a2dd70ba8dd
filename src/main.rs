// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;

use pet_ledger::{
    derive_identity, get_recent_events, insert_event, load_engine, load_stock_csv,
    persist_engine, setup_database, store_admin, AnimalType, Event, Gender, LendingEngine,
    Notification,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(args.get(2).map(String::as_str)),
        Some("stock") => run_stock(&args[2..]),
        Some("import") => run_import(&args[2..]),
        Some("borrow") => run_borrow(&args[2..]),
        Some("return") => run_return(&args[2..]),
        Some("status") => run_status(),
        Some("events") => run_events(args.get(2).map(String::as_str)),
        None => run_ui_mode(),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pet-ledger init [admin-name]");
    eprintln!("  pet-ledger stock <caller> <animal> <count>");
    eprintln!("  pet-ledger import <caller> <file.csv>");
    eprintln!("  pet-ledger borrow <caller> <age> <gender> <animal>");
    eprintln!("  pet-ledger return <caller>");
    eprintln!("  pet-ledger status");
    eprintln!("  pet-ledger events [limit]");
    eprintln!("  pet-ledger            (TUI viewer)");
}

fn db_path() -> PathBuf {
    env::var("PET_LEDGER_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("pet_ledger.db"))
}

fn open_ledger() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        bail!(
            "Ledger not found at {:?}. Run: pet-ledger init <admin-name>",
            path
        );
    }

    Connection::open(&path).with_context(|| format!("Failed to open ledger at {:?}", path))
}

/// Persist the engine state and append the audit event for one transition
fn commit(
    conn: &mut Connection,
    engine: &LendingEngine,
    note: &Notification,
    actor: &str,
) -> Result<()> {
    persist_engine(conn, engine)?;
    insert_event(conn, &Event::from_notification(note, actor))?;
    Ok(())
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_init(admin_name: Option<&str>) -> Result<()> {
    let admin_name = admin_name.unwrap_or("admin");
    let path = db_path();

    println!("🗄️  Initializing pet ledger at {:?}", path);

    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open ledger at {:?}", path))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    store_admin(&conn, &derive_identity(admin_name))?;
    println!("✓ Administrator recorded: {}", admin_name);

    Ok(())
}

fn run_stock(args: &[String]) -> Result<()> {
    let [caller, animal, count] = args else {
        bail!("Usage: pet-ledger stock <caller> <animal> <count>");
    };

    let animal = parse_animal(animal)?;
    let count: u64 = count
        .parse()
        .with_context(|| format!("Invalid count: {}", count))?;

    let mut conn = open_ledger()?;
    let mut engine = load_engine(&conn)?;

    match engine.add(&derive_identity(caller), animal, count) {
        Ok(note) => {
            commit(&mut conn, &engine, &note, caller)?;
            println!(
                "✓ Stocked {} x {} (now {} available)",
                count,
                animal,
                engine.available_count(animal)
            );
            Ok(())
        }
        Err(e) => reject(e),
    }
}

fn run_import(args: &[String]) -> Result<()> {
    let [caller, path] = args else {
        bail!("Usage: pet-ledger import <caller> <file.csv>");
    };

    println!("📂 Loading stock file {}...", path);
    let records = load_stock_csv(path.as_ref())?;
    println!("✓ Loaded {} stock rows", records.len());

    let mut conn = open_ledger()?;
    let mut engine = load_engine(&conn)?;
    let identity = derive_identity(caller);

    for record in &records {
        match engine.add(&identity, record.animal, record.count) {
            Ok(note) => commit(&mut conn, &engine, &note, caller)?,
            Err(e) => return reject(e),
        }
    }

    println!("✓ Imported {} stock rows", records.len());
    Ok(())
}

fn run_borrow(args: &[String]) -> Result<()> {
    let [caller, age, gender, animal] = args else {
        bail!("Usage: pet-ledger borrow <caller> <age> <gender> <animal>");
    };

    let age: u8 = age
        .parse()
        .with_context(|| format!("Invalid age: {}", age))?;
    let gender =
        Gender::parse(gender).with_context(|| format!("Unknown gender: {}", gender))?;
    let animal = parse_animal(animal)?;

    let mut conn = open_ledger()?;
    let mut engine = load_engine(&conn)?;

    match engine.borrow(&derive_identity(caller), age, gender, animal) {
        Ok(note) => {
            commit(&mut conn, &engine, &note, caller)?;
            println!(
                "✓ {} borrowed a {} ({} left in stock)",
                caller,
                animal,
                engine.available_count(animal)
            );
            Ok(())
        }
        Err(e) => reject(e),
    }
}

fn run_return(args: &[String]) -> Result<()> {
    let [caller] = args else {
        bail!("Usage: pet-ledger return <caller>");
    };

    let mut conn = open_ledger()?;
    let mut engine = load_engine(&conn)?;

    match engine.return_animal(&derive_identity(caller)) {
        Ok(note) => {
            commit(&mut conn, &engine, &note, caller)?;
            println!("✓ {} returned the {}", caller, note.animal());
            Ok(())
        }
        Err(e) => reject(e),
    }
}

fn run_status() -> Result<()> {
    let conn = open_ledger()?;
    let engine = load_engine(&conn)?;

    println!("📦 Inventory");
    let counts = engine.inventory().counts();
    if counts.is_empty() {
        println!("   (nothing stocked)");
    }
    for (animal, count) in counts {
        println!("   {:<8} {}", animal.as_str(), count);
    }

    println!("\n📖 Outstanding loans");
    let loans = engine.loans().loans();
    if loans.is_empty() {
        println!("   (none)");
    }
    for (identity, animal) in loans {
        println!("   {}…  {}", &identity[..12.min(identity.len())], animal);
    }

    Ok(())
}

fn run_events(limit: Option<&str>) -> Result<()> {
    let limit: usize = match limit {
        Some(s) => s
            .parse()
            .with_context(|| format!("Invalid limit: {}", s))?,
        None => 20,
    };

    let conn = open_ledger()?;
    let events = get_recent_events(&conn, limit)?;

    if events.is_empty() {
        println!("(no events)");
    }
    for event in events {
        println!(
            "{}  {:<9} {:<7} by {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.entity_id,
            event.actor
        );
    }

    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn parse_animal(s: &str) -> Result<AnimalType> {
    AnimalType::parse(s).with_context(|| format!("Unknown animal type: {}", s))
}

/// Print a rejection and exit non-zero, leaving the ledger untouched
fn reject(e: pet_ledger::LendingError) -> Result<()> {
    eprintln!("❌ Rejected: {}", e);
    std::process::exit(1);
}

// ============================================================================
// TUI MODE
// ============================================================================

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let conn = open_ledger()?;
    let engine = load_engine(&conn)?;
    let events = get_recent_events(&conn, 100)?;

    let mut app = ui::App::new(
        engine.inventory().counts(),
        engine.loans().loans(),
        events,
    );
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin pet-server --features server");
    std::process::exit(1);
}
