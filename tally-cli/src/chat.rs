use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;

use tally_core::{
    budget_name, Budget, ConversationMessage, Event, Extract, ProposalCard, Role, Session,
    TransactionCandidate, TxnType,
};
use tally_finance::Ledger;

use crate::orchestrator::Orchestrator;

type Input = Lines<BufReader<Stdin>>;

/// What has already been written to the terminal
#[derive(Default)]
struct View {
    shown: usize,
    streamed: String,
}

impl View {
    fn render_pending<E: Extract>(&mut self, session: &Session<E>) {
        let Some(pending) = session.pending() else {
            return;
        };
        if let Some(fresh) = pending.content.get(self.streamed.len()..) {
            if !fresh.is_empty() {
                print!("{}", fresh);
                io::stdout().flush().ok();
                self.streamed.push_str(fresh);
            }
        }
    }

    /// Assistant messages appended since the last call
    fn take_new<E: Extract>(&mut self, session: &Session<E>) -> Vec<ConversationMessage> {
        let messages = session.messages();
        let fresh = messages[self.shown.min(messages.len())..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .cloned()
            .collect();
        self.shown = messages.len();
        fresh
    }

    fn finish(&mut self, msg: &ConversationMessage) {
        let streamed = std::mem::take(&mut self.streamed);
        if msg.content.is_empty() {
            if !streamed.is_empty() {
                println!();
            }
            return;
        }
        match msg.content.strip_prefix(streamed.as_str()) {
            Some(rest) if !streamed.is_empty() => println!("{}", rest),
            _ if !streamed.is_empty() => println!("\n{}", msg.content),
            _ => println!("{}", msg.content),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CardCommand {
    Save,
    Skip,
    Undo,
    Amount(f64),
    Budget(Option<usize>),
    Unknown,
}

impl CardCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match head.to_lowercase().as_str() {
            "y" | "yes" | "" => CardCommand::Save,
            "n" | "no" => CardCommand::Skip,
            "u" | "undo" => CardCommand::Undo,
            "e" | "edit" => match rest.replace(',', ".").parse::<f64>() {
                Ok(v) => CardCommand::Amount(v),
                Err(_) => CardCommand::Unknown,
            },
            "b" | "budget" if rest.is_empty() => CardCommand::Budget(None),
            "b" | "budget" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => CardCommand::Budget(Some(n - 1)),
                _ => CardCommand::Unknown,
            },
            _ => CardCommand::Unknown,
        }
    }
}

fn render_card(card: &ProposalCard) -> String {
    let d = card.draft();
    let sign = match d.kind {
        TxnType::Expense => "-",
        TxnType::Income => "+",
    };
    let mut out = format!("  {}  {}{:.2}  {}", d.title, sign, d.amount, d.date);
    if let Some(name) = budget_name(d.budget_folder_id.as_deref(), card.budgets()) {
        out.push_str(&format!("  [{}]", name));
    }
    if card.candidate().is_autofilled() {
        out.push_str("  (filled from a recurring rule; u to undo)");
    }
    out
}

fn prompt(label: &str) {
    print!("{}", label);
    io::stdout().flush().ok();
}

async fn confirm(
    candidate: TransactionCandidate,
    budgets: Vec<Budget>,
    ledger: &Ledger,
    user_id: &str,
    input: &mut Input,
) -> Result<()> {
    let mut card = ProposalCard::new(candidate, budgets);
    loop {
        println!("{}", render_card(&card));
        prompt("  save? [y]es [n]o [e <amount>] [b <n>] [u]ndo > ");
        let Some(line) = input.next_line().await.context("read stdin")? else {
            return Ok(());
        };
        match CardCommand::parse(&line) {
            CardCommand::Save => {
                let saved = card
                    .save(ledger, user_id, Utc::now(), |m| eprintln!("  Could not save: {}", m))
                    .await?;
                if let Some(id) = saved {
                    println!("  Saved ({})", id);
                    return Ok(());
                }
            }
            CardCommand::Skip => return Ok(()),
            CardCommand::Undo => {
                if card.undo_autofill()? {
                    println!("  Restored the values you entered.");
                } else {
                    println!("  Nothing to undo.");
                }
            }
            CardCommand::Amount(v) => card.update(|d| d.amount = v)?,
            CardCommand::Budget(None) => {
                for (i, b) in card.budgets().iter().enumerate() {
                    println!("  {}. {}", i + 1, b.name);
                }
            }
            CardCommand::Budget(Some(i)) => match card.budgets().get(i).map(|b| b.id.clone()) {
                Some(id) => card.update(|d| d.budget_folder_id = Some(id))?,
                None => println!("  No budget {}.", i + 1),
            },
            CardCommand::Unknown => println!("  y, n, u, e <amount> or b <n>"),
        }
    }
}

/// Line-oriented chat loop. `/stop` aborts the request in flight, `/quit` exits.
pub async fn run<E: Extract>(
    mut orch: Orchestrator<E>,
    mut rx: UnboundedReceiver<Event>,
    ledger: Arc<Ledger>,
) -> Result<()> {
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    let mut view = View::default();
    let user_id = orch.session().config().user_id.clone();

    println!(
        "tally chat ({}). Type a transaction or a question. /stop aborts, /quit exits.",
        orch.session().config().locale
    );
    prompt("> ");

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line.context("read stdin")? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/stop" => {
                        orch.stop();
                        view.streamed.clear();
                        println!();
                    }
                    "" => {}
                    text => orch.submit(text),
                }
            }
            Some(event) = rx.recv() => orch.apply(event),
        }

        view.render_pending(orch.session());
        for msg in view.take_new(orch.session()) {
            view.finish(&msg);
            let proposals = msg.proposals();
            if proposals.is_empty() {
                continue;
            }
            let budgets = orch.enricher().budgets().await;
            for candidate in proposals {
                confirm(candidate, budgets.clone(), &ledger, &user_id, &mut input).await?;
            }
        }
        if !orch.session().is_busy() && view.streamed.is_empty() {
            prompt("> ");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_card_commands() {
        assert_eq!(CardCommand::parse("y"), CardCommand::Save);
        assert_eq!(CardCommand::parse(""), CardCommand::Save);
        assert_eq!(CardCommand::parse("N"), CardCommand::Skip);
        assert_eq!(CardCommand::parse("e 12,5"), CardCommand::Amount(12.5));
        assert_eq!(CardCommand::parse("e lots"), CardCommand::Unknown);
        assert_eq!(CardCommand::parse("b"), CardCommand::Budget(None));
        assert_eq!(CardCommand::parse("b 2"), CardCommand::Budget(Some(1)));
        assert_eq!(CardCommand::parse("b 0"), CardCommand::Unknown);
        assert_eq!(CardCommand::parse("u"), CardCommand::Undo);
    }

    #[test]
    fn test_render_card_shows_budget_and_autofill() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let manual = TransactionCandidate::new("Spotify", 9.5, TxnType::Expense, date).unwrap();
        let filled = manual
            .autofilled(11.99, TxnType::Expense, Some("Subscriptions".into()))
            .unwrap();
        let card = ProposalCard::new(filled, vec![Budget::new("b-subs", "Subscriptions")]);
        let line = render_card(&card);
        assert!(line.contains("Spotify  -11.99  2026-05-01"));
        assert!(line.contains("[Subscriptions]"));
        assert!(line.contains("u to undo"));

        let plain = ProposalCard::new(manual, Vec::new());
        assert_eq!(render_card(&plain), "  Spotify  -9.50  2026-05-01");
    }
}
