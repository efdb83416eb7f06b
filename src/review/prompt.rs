// The interactive annotation loop, over any line-based input and output.

use log::debug;
use std::io::{BufRead, Write};

use review_core::form::FormInput;
use review_core::store::RecordStore;

use crate::review::*;

/// What is shown of an item.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct View {
    pub revision: FormRevision,
    pub display_columns: Vec<String>,
    pub content_column: String,
}

impl View {
    pub fn from_config(config: &ReviewConfig) -> View {
        View {
            revision: config.form_revision,
            display_columns: config.display_columns(),
            content_column: config.catalog_source.content_column(),
        }
    }

    pub fn render(&self, item: &Item) -> String {
        let mut lines: Vec<String> = Vec::new();
        for column in self.display_columns.iter() {
            let v = item.display(column);
            if !v.is_empty() {
                lines.push(format!("{}: {}", column, v));
            }
        }
        lines.push("".to_string());
        lines.push(item.display(&self.content_column));
        lines.join("\n")
    }
}

enum Action {
    Submit,
    Next,
    Progress,
    Quit,
}

fn parse_action(s: &str) -> Option<Action> {
    match s.trim().to_lowercase().as_str() {
        "s" | "submit" => Some(Action::Submit),
        "n" | "next" => Some(Action::Next),
        "p" | "progress" => Some(Action::Progress),
        "q" | "quit" => Some(Action::Quit),
        _ => None,
    }
}

/// Reads one line. None at the end of the input.
fn read_answer<R: BufRead>(input: &mut R) -> ReviewResult<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context(TerminalSnafu {})?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Asks for one form field. An empty answer keeps the current value and a
/// single `-` clears it. Returns false at the end of the input.
fn ask<R: BufRead, W: Write>(
    name: &str,
    hint: &str,
    value: &mut String,
    input: &mut R,
    out: &mut W,
) -> ReviewResult<bool> {
    if hint.is_empty() {
        write!(out, "{} [{}]: ", name, value).context(TerminalSnafu {})?;
    } else {
        write!(out, "{} ({}) [{}]: ", name, hint, value).context(TerminalSnafu {})?;
    }
    out.flush().context(TerminalSnafu {})?;
    match read_answer(input)? {
        None => Ok(false),
        Some(answer) => {
            match answer.trim() {
                "" => {}
                "-" => value.clear(),
                x => *value = x.to_string(),
            }
            Ok(true)
        }
    }
}

fn labels<T>(all: &[T], label: fn(&T) -> &'static str) -> String {
    all.iter().map(label).collect::<Vec<&str>>().join("/")
}

/// Prompts the fields of the revision, in form order. The conditional field
/// is only asked when its trigger value is selected.
fn fill_form<R: BufRead, W: Write>(
    form: &mut FormInput,
    revision: FormRevision,
    input: &mut R,
    out: &mut W,
) -> ReviewResult<bool> {
    match revision {
        FormRevision::StatusReview => {
            let hint = labels(&ReviewStatus::ALL, ReviewStatus::label);
            if !ask("status", &hint, &mut form.status, input, out)? {
                return Ok(false);
            }
            if !ask("comment", "", &mut form.comment, input, out)? {
                return Ok(false);
            }
            if ReviewStatus::parse(&form.status) == Some(ReviewStatus::NewItem)
                && !ask("new_item_text", "", &mut form.new_item_text, input, out)?
            {
                return Ok(false);
            }
        }
        FormRevision::AdequacyReview => {
            let hint = labels(&Adequacy::ALL, Adequacy::label);
            if !ask("adequacy", &hint, &mut form.adequacy, input, out)? {
                return Ok(false);
            }
            let range = format!("{}-{}", MIN_RELEVANCE, MAX_RELEVANCE);
            if !ask("relevance", &range, &mut form.relevance, input, out)? {
                return Ok(false);
            }
            if Adequacy::parse(&form.adequacy) == Some(Adequacy::Partial)
                && !ask("justification", "", &mut form.justification, input, out)?
            {
                return Ok(false);
            }
            if !ask("comment", "", &mut form.comment, input, out)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn print_progress<W: Write>(session: &Session, out: &mut W) -> ReviewResult<()> {
    say(out, &format!("Progress: {}", session.progress()))?;
    for (label, count) in session.summary() {
        say(out, &format!("  {}: {}", label, count))?;
    }
    Ok(())
}

/// Presents the candidates one at a time until the reviewer quits, the
/// input ends or every item is annotated.
///
/// The form survives a failed submission so that the reviewer only fixes
/// the faulty fields. It is cleared after a successful submission and when
/// moving to the next item.
pub fn annotate_loop<R: BufRead, W: Write>(
    session: &mut Session,
    store: &mut dyn RecordStore,
    view: &View,
    input: &mut R,
    out: &mut W,
) -> ReviewResult<()> {
    let mut form = FormInput::default();
    loop {
        let item = match session.current() {
            Some(item) => item.clone(),
            None => {
                say(out, "All items annotated.")?;
                return Ok(());
            }
        };
        say(out, "")?;
        say(out, &view.render(&item))?;
        say(out, &format!("Progress: {}", session.progress()))?;
        write!(out, "[s]ubmit [n]ext [p]rogress [q]uit > ").context(TerminalSnafu {})?;
        out.flush().context(TerminalSnafu {})?;
        let answer = match read_answer(input)? {
            Some(a) => a,
            None => return Ok(()),
        };
        match parse_action(&answer) {
            Some(Action::Submit) => {
                if !fill_form(&mut form, view.revision, input, out)? {
                    return Ok(());
                }
                match session.submit(&form, store) {
                    Ok(record) => {
                        say(
                            out,
                            &format!("Saved {} for item {}", record.judgment.label(), record.key()),
                        )?;
                        form = FormInput::default();
                    }
                    Err(SessionError::InvalidForm { issues }) => {
                        for issue in issues.iter() {
                            say(out, &format!("  {}", issue))?;
                        }
                    }
                    Err(e) => {
                        debug!("annotate_loop: submission failed: {:?}", e);
                        say(out, &format!("Error: {}", e))?;
                    }
                }
            }
            Some(Action::Next) => {
                session.show_next();
                form = FormInput::default();
            }
            Some(Action::Progress) => print_progress(session, out)?,
            Some(Action::Quit) => return Ok(()),
            None => say(out, &format!("Unknown command {:?}", answer.trim()))?,
        }
    }
}
