use mc_blackjack::{Action, EnvironmentModel, State};
use prettytable::{Cell, Row, Table};

const UP_CARD_VALUES: std::ops::RangeInclusive<u8> = 2..=11;
const PLAYER_TOTALS: std::ops::RangeInclusive<u8> = 12..=21;

fn action_cell(model: &EnvironmentModel, state: State) -> Cell {
    let visits =
        model.get_visits(state, Action::Hit) + model.get_visits(state, Action::Stand);
    if visits == 0 {
        return Cell::new("");
    }
    let action = model.greedy_action(state);
    let symbol = match action {
        Action::Hit => "H",
        Action::Stand => "S",
    };
    Cell::new(&format!("{} {:+.2}", symbol, model.get_value(state, action)))
}

/// Greedy action and its value for every state where standing is an option.
/// Unvisited states are left blank.
pub fn policy_table(model: &EnvironmentModel) -> Table {
    let mut table = Table::new();

    let mut header = vec![Cell::new(""), Cell::new("Ace?")];
    for up_card_value in UP_CARD_VALUES {
        header.push(match up_card_value {
            11 => Cell::new("A"),
            value => Cell::new(&value.to_string()),
        });
    }
    table.add_row(Row::new(header));

    for usable_ace in [false, true] {
        for player_total in PLAYER_TOTALS {
            let mut cells = vec![
                Cell::new(&player_total.to_string()),
                Cell::new(if usable_ace { "Y" } else { "N" }),
            ];
            for up_card_value in UP_CARD_VALUES {
                let state = State::new(player_total, up_card_value, usable_ace);
                cells.push(action_cell(model, state));
            }
            table.add_row(Row::new(cells));
        }
    }
    table
}
