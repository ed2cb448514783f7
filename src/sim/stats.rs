/// End-of-match statistics, laid out as a fixed-width table for the
/// game-over screen.

use crate::domain::player::{Player, PlayerId};

#[derive(Clone, Debug, PartialEq)]
pub struct StatRow {
    pub name: &'static str,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatsTable {
    pub header: Vec<String>,
    pub rows: Vec<StatRow>,
}

pub fn player_label(id: PlayerId) -> String {
    format!("P{}", id.0 + 1)
}

/// One column per player in roster order.
pub fn stats_table(players: &[Player]) -> StatsTable {
    let col = |f: &dyn Fn(&Player) -> String| players.iter().map(f).collect::<Vec<_>>();
    StatsTable {
        header: players.iter().map(|p| player_label(p.id)).collect(),
        rows: vec![
            StatRow { name: "Attacks Made", values: col(&|p: &Player| p.stats.attacks_made.to_string()) },
            StatRow { name: "Hits Landed", values: col(&|p: &Player| p.stats.hits_landed.to_string()) },
            StatRow { name: "Hits Taken", values: col(&|p: &Player| p.stats.hits_received.to_string()) },
            StatRow { name: "Accuracy", values: col(&|p: &Player| format!("{:.1}%", p.stats.accuracy())) },
            StatRow { name: "Suicides", values: col(&|p: &Player| p.stats.suicides.to_string()) },
        ],
    }
}

impl StatsTable {
    /// Left-aligned label column, right-aligned value columns.
    pub fn lines(&self) -> Vec<String> {
        let label_w = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max("Stat".len());
        let col_w = self
            .rows
            .iter()
            .flat_map(|r| r.values.iter().map(String::len))
            .chain(self.header.iter().map(String::len))
            .max()
            .unwrap_or(0);

        let mut out = Vec::with_capacity(self.rows.len() + 1);
        let mut head = format!("{:<label_w$}", "Stat");
        for h in &self.header {
            head.push_str(&format!("  {:>col_w$}", h));
        }
        out.push(head);
        for r in &self.rows {
            let mut line = format!("{:<label_w$}", r.name);
            for v in &r.values {
                line.push_str(&format!("  {:>col_w$}", v));
            }
            out.push(line);
        }
        out
    }
}

pub fn final_stocks(players: &[Player]) -> String {
    let stocks: Vec<String> = players.iter().map(|p| p.lives().to_string()).collect();
    format!("Final Stocks: {}", stocks.join(" - "))
}

pub fn winner_announcement(winner: Option<PlayerId>) -> String {
    match winner {
        Some(id) => format!("{} Wins!", player_label(id)),
        None => "Draw!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, Tuning};
    use crate::sim::world::MatchState;

    #[test]
    fn table_aligns_columns() {
        let mut w = MatchState::new(&GameConfig::default()).unwrap();
        w.players[0].stats.attacks_made = 12;
        w.players[0].stats.hits_landed = 3;
        w.players[1].stats.hits_received = 3;
        w.players[1].stats.suicides = 1;

        let t = stats_table(&w.players);
        assert_eq!(t.header, vec!["P1", "P2"]);
        assert_eq!(t.rows[2].values, vec!["0", "3"]);
        assert_eq!(t.rows[3].values, vec!["25.0%", "0.0%"]);

        let lines = t.lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Stat             P1     P2");
        assert_eq!(lines[1], "Attacks Made     12      0");
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn announcements() {
        let w = MatchState::new(&GameConfig::default()).unwrap();
        let lives = Tuning::default().initial_lives;
        assert_eq!(final_stocks(&w.players), format!("Final Stocks: {lives} - {lives}"));
        assert_eq!(winner_announcement(Some(PlayerId(1))), "P2 Wins!");
        assert_eq!(winner_announcement(None), "Draw!");
    }
}
