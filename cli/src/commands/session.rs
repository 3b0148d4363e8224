use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use rand::Rng;

use mealplan_core::models::PlanOutcome;
use mealplan_core::service::{PLAN_SIZE_CHOICES, PlannerSession};

use super::helpers::{
    describe_plan, make_rng, render_plan_matrix, render_recipe_selection, render_saved_plans,
};
use super::plan::NO_SELECTION_MESSAGE;

const HELP: &str = "\
Commands:
  search [text]     list recipes whose name or ingredients match
  toggle <recipe>   select or deselect a recipe to build the plan around
  clear             deselect every recipe
  size <3-7>        number of recipes per meal plan
  plan              build a new meal plan from the selection
  save              save the current meal plan
  saved             list saved meal plans
  use <n>           show saved meal plan n
  new               stop using a saved plan
  help              show this help
  quit              leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Search(String),
    Toggle(String),
    Clear,
    Size(usize),
    Plan,
    Save,
    Saved,
    Use(usize),
    New,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<SessionCommand> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_lowercase().as_str() {
        "search" | "s" => SessionCommand::Search(rest.to_string()),
        "toggle" | "t" => {
            if rest.is_empty() {
                bail!("Usage: toggle <recipe name>");
            }
            SessionCommand::Toggle(rest.to_string())
        }
        "clear" => SessionCommand::Clear,
        "size" => {
            let size: usize = rest
                .parse()
                .map_err(|_| anyhow::anyhow!("Usage: size <{}>", size_choices()))?;
            SessionCommand::Size(size)
        }
        "plan" | "p" => SessionCommand::Plan,
        "save" => SessionCommand::Save,
        "saved" => SessionCommand::Saved,
        "use" => {
            let n: usize = rest
                .parse()
                .map_err(|_| anyhow::anyhow!("Usage: use <saved plan number>"))?;
            if n == 0 {
                bail!("Saved plans are numbered from 1");
            }
            SessionCommand::Use(n - 1)
        }
        "new" => SessionCommand::New,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => bail!("Unknown command '{other}'. Type 'help' for a list of commands"),
    };
    Ok(command)
}

pub(crate) fn cmd_session(mut session: PlannerSession, rng_seed: Option<u64>) -> Result<()> {
    let mut rng = make_rng(rng_seed);
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(&mut session, stdin.lock(), stdout.lock(), &mut rng)
}

/// Drive a session from line-oriented input until `quit` or end of input.
fn run_session<I: BufRead, O: Write, R: Rng>(
    session: &mut PlannerSession,
    input: I,
    mut out: O,
    rng: &mut R,
) -> Result<()> {
    let recipes = session.table().len();
    let size = session.plan_size();
    writeln!(
        out,
        "Loaded {recipes} recipes. Meal plans have {size} recipes. Type 'help' for commands."
    )?;
    prompt(&mut out)?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            prompt(&mut out)?;
            continue;
        }

        match parse_command(&line) {
            Ok(SessionCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = apply(session, command, &mut out, rng) {
                    writeln!(out, "Error: {e:#}")?;
                }
            }
            Err(e) => writeln!(out, "{e}")?,
        }
        prompt(&mut out)?;
    }

    writeln!(out)?;
    Ok(())
}

fn apply<O: Write, R: Rng>(
    session: &mut PlannerSession,
    command: SessionCommand,
    out: &mut O,
    rng: &mut R,
) -> Result<()> {
    match command {
        SessionCommand::Search(query) => {
            let dataset = session.dataset();
            let recipes: Vec<_> = session
                .search(&query)
                .into_iter()
                .map(|row| dataset.recipe_summary(row))
                .collect();
            if recipes.is_empty() {
                writeln!(out, "No recipes match '{query}'")?;
            } else {
                writeln!(out, "{}", render_recipe_selection(&recipes, |id| session.is_selected(id)))?;
            }
        }
        SessionCommand::Toggle(name) => {
            let selected = session.toggle_recipe(&name)?;
            let verb = if selected { "Selected" } else { "Deselected" };
            writeln!(out, "{verb} {name}")?;
            show_plan(session, out, rng)?;
        }
        SessionCommand::Clear => {
            session.clear_selection();
            writeln!(out, "Selection cleared")?;
        }
        SessionCommand::Size(size) => {
            session.set_plan_size(size)?;
            writeln!(out, "Meal plans now have {size} recipes")?;
            show_plan(session, out, rng)?;
        }
        SessionCommand::Plan => show_plan(session, out, rng)?,
        SessionCommand::Save => {
            let saved = session.save_current_plan()?;
            writeln!(out, "Saved: {}", saved.label)?;
        }
        SessionCommand::Saved => {
            writeln!(
                out,
                "{}",
                render_saved_plans(session.saved_plans(), session.active_saved_plan())
            )?;
        }
        SessionCommand::Use(index) => {
            session.select_saved_plan(index)?;
            show_plan(session, out, rng)?;
        }
        SessionCommand::New => {
            session.clear_saved_plan_selection();
            writeln!(out, "Generating new meal plans from your selection")?;
        }
        SessionCommand::Help => writeln!(out, "{HELP}")?,
        SessionCommand::Quit => {}
    }
    Ok(())
}

fn show_plan<O: Write, R: Rng>(session: &mut PlannerSession, out: &mut O, rng: &mut R) -> Result<()> {
    let view = session.build_plan(rng)?;
    match (&view.outcome, &view.chart) {
        (PlanOutcome::Planned { plan }, Some(chart)) => {
            writeln!(out, "{}\n", describe_plan(plan))?;
            writeln!(out, "{}", render_plan_matrix(chart))?;
        }
        _ => writeln!(out, "{NO_SELECTION_MESSAGE}")?,
    }
    Ok(())
}

fn prompt<O: Write>(out: &mut O) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn size_choices() -> String {
    format!("{}-{}", PLAN_SIZE_CHOICES.start(), PLAN_SIZE_CHOICES.end())
}
