use crate::session::ViewerSession;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::json;
use simcity_engine::play::merged_resources;
use simcity_engine::{
    ActionChoice, Board, EpisodeCursor, GameConfig, Notice, PlayerId, Selection,
};
use simcity_protocol::{targets, Patch, ResourceRecord, UiUpdate};
use std::collections::BTreeMap;

const SELECTED_COLOR: &str = "#dbeafe";

struct BoardView {
    selection: Option<Selection>,
    show_builders: bool,
    selectable: bool,
}

/// Full page state as one update: every panel, every time. The page is
/// small enough that diffing is not worth it.
pub fn update(session: &mut ViewerSession, event: &str) -> UiUpdate {
    let notice = session.notices.current().cloned();
    let config = session.config().clone();
    let play = session.play();
    let sim = session.sim();

    let mut patches = vec![
        Patch::replace(
            targets::PLAY_BOARD,
            board_html(
                &config,
                play.board(),
                &BoardView {
                    selection: play.selection(),
                    show_builders: true,
                    selectable: true,
                },
            ),
            json!({ "board": play.board() }),
        ),
        players_patch(
            targets::PLAY_PLAYERS,
            &config,
            &play.resources(),
            Some(config.human()),
        ),
        action_patch(&config, play.selection(), play.choice()),
        step_patch(session),
    ];

    match sim {
        Some(cursor) => {
            let live = cursor.current_turn().map(|t| &t.resources);
            patches.push(Patch::replace(
                targets::SIM_BOARD,
                board_html(
                    &config,
                    cursor.board(),
                    &BoardView {
                        selection: None,
                        show_builders: session.show_builders,
                        selectable: false,
                    },
                ),
                json!({ "board": cursor.board(), "revision": cursor.revision() }),
            ));
            patches.push(players_patch(
                targets::SIM_PLAYERS,
                &config,
                &merged_resources(&config, live),
                Some(cursor.current_player()),
            ));
            patches.push(turn_patch(cursor));
        }
        None => {
            patches.push(Patch::replace(
                targets::SIM_BOARD,
                board_html(
                    &config,
                    &Board::empty(config.grid_size),
                    &BoardView {
                        selection: None,
                        show_builders: session.show_builders,
                        selectable: false,
                    },
                ),
                json!({ "board": null }),
            ));
            patches.push(players_patch(
                targets::SIM_PLAYERS,
                &config,
                &merged_resources(&config, None),
                None,
            ));
            patches.push(Patch::replace(
                targets::SIM_TURN,
                "<div class=\"muted\">No simulation data. Click Simulate Episode to fetch data.</div>"
                    .to_string(),
                json!({ "loaded": false }),
            ));
        }
    }

    patches.push(notice_patch(notice.as_ref()));

    UiUpdate::new(event, patches).with_payload(json!({
        "show_builders": session.show_builders,
        "board_publishes": session.board_publishes(),
    }))
}

fn board_html(config: &GameConfig, board: &Board, view: &BoardView) -> String {
    let mut out = String::from("<table class=\"board\"><tbody>");
    for (r, row) in board.rows().enumerate() {
        out.push_str("<tr>");
        for (c, cell) in row.iter().enumerate() {
            let selected = view.selection == Some(Selection::new(r, c));
            let color = if selected {
                SELECTED_COLOR
            } else {
                config.building_color(cell.building)
            };
            let class = if view.selectable { "cell pick" } else { "cell" };
            out.push_str(&format!(
                "<td class=\"{class}\" data-row=\"{r}\" data-col=\"{c}\" style=\"background:{}\">",
                attr(color)
            ));
            out.push_str(&format!(
                "<span class=\"name\">{}</span>",
                text(&config.building_name(cell.building))
            ));
            if view.show_builders {
                let owner = match cell.owner {
                    Some(p) => format!("Built by {p}"),
                    None => "Unclaimed".to_string(),
                };
                out.push_str(&format!("<span class=\"owner\">{}</span>", text(&owner)));
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

fn players_patch(
    target: &str,
    config: &GameConfig,
    resources: &BTreeMap<String, ResourceRecord>,
    highlight: Option<PlayerId>,
) -> Patch {
    let mut out = String::from("<div class=\"players\">");
    for (id, spec) in config.roster() {
        let name = id.to_string();
        let r = resources.get(&name).copied().unwrap_or(spec.resources);
        let class = if Some(id) == highlight { "player on" } else { "player" };
        out.push_str(&format!(
            "<div class=\"{class}\"><strong>{}</strong>: {}<div>Money: {}</div><div>Reputation: {}</div>",
            text(&name),
            text(&spec.role),
            r.money,
            r.reputation
        ));
        if id == config.human() {
            out.push_str("<div class=\"muted\">(Human)</div>");
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
    Patch::replace(
        target,
        out,
        json!({ "resources": resources, "highlight": highlight }),
    )
}

fn action_patch(
    config: &GameConfig,
    selection: Option<Selection>,
    choice: Option<ActionChoice>,
) -> Patch {
    let Some(sel) = selection else {
        return Patch::replace(
            targets::PLAY_ACTION,
            "<p>Please click on an empty cell on the board to select a parcel.</p>".to_string(),
            json!({ "selection": null }),
        );
    };

    let mut out = format!(
        "<p>Selected Parcel at ({}, {})</p><div class=\"choices\">",
        sel.row, sel.col
    );
    let mut options = vec![(ActionChoice::Skip, "Skip".to_string())];
    options.extend(
        config
            .buildings
            .iter()
            .enumerate()
            .map(|(i, b)| (ActionChoice::Build(i as u32), format!("Build {}", b.name))),
    );
    for (option, label) in options {
        let class = if choice == Some(option) { "btn on" } else { "btn" };
        out.push_str(&format!(
            "<button type=\"button\" class=\"{class}\" data-choice=\"{}\">{}</button>",
            attr(&option.to_string()),
            text(&label)
        ));
    }
    out.push_str(
        "</div><button type=\"button\" class=\"btn primary rpc\" data-api=\"/api/play/submit\">Submit Action</button>",
    );
    Patch::replace(
        targets::PLAY_ACTION,
        out,
        json!({
            "selection": sel,
            "choice": choice.map(|c| c.to_string()),
        }),
    )
}

fn step_patch(session: &ViewerSession) -> Patch {
    let config = session.config();
    let Some(step) = session.play().last_step() else {
        return Patch::replace(targets::PLAY_STEP, String::new(), json!({ "step": null }));
    };
    let codes: Vec<String> = step.actions_taken.iter().map(i64::to_string).collect();
    let described = step.describe_actions(config);
    let mut out = format!("<h3>Turn {} Info</h3>", step.t_env);
    out.push_str(&format!(
        "<p><strong>Actions Taken:</strong> {} <span class=\"muted\">({})</span></p>",
        text(&codes.join(", ")),
        text(&described.join("; "))
    ));
    out.push_str(&info_html(&step.info));
    Patch::replace(targets::PLAY_STEP, out, json!({ "step": step }))
}

fn turn_patch(cursor: &EpisodeCursor) -> Patch {
    let pos = cursor.position();
    let movements = cursor.movements_in_turn(pos.turn);
    let mut out = format!(
        "<p>Turn {} of {}</p>",
        pos.turn + 1,
        cursor.turn_count()
    );
    if let Some(turn) = cursor.current_turn() {
        out.push_str(&format!(
            "<h3>Turn {} - Movement: {} of {}</h3>",
            turn.t_env,
            cursor.current_player(),
            movements
        ));
        let actions: Vec<String> = turn.actions.iter().map(i64::to_string).collect();
        out.push_str(&format!(
            "<p><strong>Actions:</strong> {}</p>",
            text(&actions.join(", "))
        ));
        if let Some(rewards) = &turn.rewards {
            out.push_str(&format!(
                "<p><strong>Rewards:</strong> {}</p>",
                text(&rewards.to_string())
            ));
        }
        out.push_str(&info_html(&turn.info));
    }
    let nav = [
        ("previous_turn", "Previous Turn", cursor.can_previous_turn()),
        ("next_turn", "Next Turn", cursor.can_next_turn()),
        ("previous_movement", "Previous Movement", cursor.can_previous_movement()),
        ("next_movement", "Next Movement", cursor.can_next_movement()),
    ];
    out.push_str("<div class=\"nav\">");
    for (op, label, enabled) in nav {
        let disabled = if enabled { "" } else { " disabled" };
        out.push_str(&format!(
            "<button type=\"button\" class=\"btn\" data-nav=\"{op}\"{disabled}>{label}</button>"
        ));
    }
    out.push_str("</div>");

    Patch::replace(
        targets::SIM_TURN,
        out,
        json!({
            "loaded": true,
            "position": pos,
            "turns": cursor.turn_count(),
            "movements": movements,
            "current_player": cursor.current_player(),
            "can_next_turn": cursor.can_next_turn(),
            "can_previous_turn": cursor.can_previous_turn(),
            "can_next_movement": cursor.can_next_movement(),
            "can_previous_movement": cursor.can_previous_movement(),
        }),
    )
}

fn info_html(info: &serde_json::Value) -> String {
    if info.is_null() {
        return String::new();
    }
    let pretty = serde_json::to_string_pretty(info).unwrap_or_default();
    format!("<pre class=\"info\">{}</pre>", text(&pretty))
}

fn notice_patch(notice: Option<&Notice>) -> Patch {
    match notice {
        Some(n) => {
            let ttl_ms = (n.expires_at - n.raised_at).whole_milliseconds() as i64;
            Patch::replace(
                targets::NOTICE,
                format!("<div class=\"notice\">{}</div>", text(&n.message)),
                json!({ "notice": n, "ttl_ms": ttl_ms }),
            )
        }
        None => Patch::replace(targets::NOTICE, String::new(), json!({ "notice": null })),
    }
}
