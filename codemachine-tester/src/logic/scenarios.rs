use anyhow::{bail, ensure};
use codemachine_game::SolutionKind;
use codemachine_game::events::{EVENT_ENTER, EVENT_FATAL, EVENT_INITIALIZE, EVENT_MANUAL_UPDATE};

use super::policy::SubjectStrategy;
use super::simulation::{Outcome, SimulationPlan};

/// Keys run by `--scenarios all`, in catalog order.
pub const SCENARIO_KEYS: [&str; 6] = [
    "smoke",
    "forced-reveal",
    "dial-explorer",
    "manual-reader",
    "try-ceiling",
    "deterministic-replay",
];

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
        }
    }
}

pub fn get_scenario(key: &str) -> Option<TestScenario> {
    let scenario = match key {
        "smoke" => smoke(),
        "forced-reveal" => forced_reveal(),
        "dial-explorer" => dial_explorer(),
        "manual-reader" => manual_reader(),
        "try-ceiling" => try_ceiling(),
        "deterministic-replay" => deterministic_replay(),
        _ => return None,
    };
    Some(scenario)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIO_KEYS
        .iter()
        .filter_map(|key| get_scenario(key))
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

fn smoke() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::ButtonMasher)
        .with_expectation(|summary| {
            ensure!(
                matches!(summary.outcome, Outcome::Solved(_)),
                "expected a solved puzzle, got {}",
                summary.outcome
            );
            ensure!(summary.done_events() == 1, "machine.done fired {} times", summary.done_events());
            Ok(())
        })
        .with_expectation(|summary| {
            match summary.events.first() {
                Some(first) if first.name == EVENT_INITIALIZE => {}
                other => bail!("transcript starts with {:?}", other.map(|e| &e.name)),
            }
            if let Some(stray) = summary.events.iter().find(|e| e.trial_id != summary.trial_id) {
                bail!("event {} carries trial id {}", stray.name, stray.trial_id);
            }
            ensure!(summary.manual_len == 1, "manual holds {} entries", summary.manual_len);
            Ok(())
        });
    TestScenario::new(
        "smoke",
        "Smoke",
        "Button presses solve a generated task and log a clean transcript",
        plan,
    )
}

fn forced_reveal() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::ButtonMasher)
        .with_solution_kind(SolutionKind::Compositional)
        .with_tweak(|cfg| cfg.n_click_partial = 2)
        .with_expectation(|summary| {
            ensure!(
                summary.outcome == Outcome::Solved(SolutionKind::Compositional),
                "expected compositional solve, got {}",
                summary.outcome
            );
            ensure!(
                summary.presses == 4,
                "two presses per half should reveal the code, took {}",
                summary.presses
            );
            ensure!(summary.fallback_warnings() == 0, "search fell back to the solution");
            Ok(())
        });
    TestScenario::new(
        "forced-reveal",
        "Forced Reveal",
        "Exhausted partial budgets reveal each half on schedule",
        plan,
    )
}

fn dial_explorer() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::DialExplorer)
        .with_max_steps(2000)
        .with_expectation(|summary| {
            ensure!(
                summary.outcome != Outcome::Halted,
                "explorer neither solved nor hit the try ceiling in {} steps",
                summary.steps
            );
            Ok(())
        })
        .with_expectation(|summary| {
            let entered = summary.count(EVENT_ENTER);
            ensure!(
                u32::try_from(entered).ok() == Some(summary.n_try),
                "{entered} machine.enter events for {} tries",
                summary.n_try
            );
            let selects = summary
                .events
                .iter()
                .filter(|e| e.name.starts_with("machine.select."))
                .count();
            ensure!(
                selects == summary.dial_turns,
                "{selects} select events for {} dial turns",
                summary.dial_turns
            );
            Ok(())
        });
    TestScenario::new(
        "dial-explorer",
        "Dial Explorer",
        "Random dial turns are all counted and logged",
        plan,
    )
}

fn manual_reader() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::ManualReader)
        .with_seeded_manual()
        .with_expectation(|summary| {
            ensure!(
                summary.outcome == Outcome::Solved(SolutionKind::Compositional),
                "expected compositional solve, got {}",
                summary.outcome
            );
            ensure!(
                summary.n_try == 1 && summary.presses == 0,
                "reader needed {} tries and {} presses",
                summary.n_try,
                summary.presses
            );
            ensure!(
                summary.count(EVENT_MANUAL_UPDATE) == 0 && summary.manual_len == 1,
                "known solution was recorded again"
            );
            Ok(())
        });
    TestScenario::new(
        "manual-reader",
        "Manual Reader",
        "A subject who reads the manual types the known code in one try",
        plan,
    )
}

fn try_ceiling() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::DialExplorer)
        .with_max_steps(200)
        .with_tweak(|cfg| cfg.max_tries = 5)
        .with_expectation(|summary| match summary.outcome {
            Outcome::Abandoned => {
                ensure!(summary.fatal_events() == 1, "machine.fatal fired {} times", summary.fatal_events());
                ensure!(
                    summary.events.last().is_some_and(|e| e.name == EVENT_FATAL),
                    "events logged after machine.fatal"
                );
                ensure!(
                    summary.n_try > summary.max_tries,
                    "abandoned at try {} of {}",
                    summary.n_try,
                    summary.max_tries
                );
                ensure!(
                    summary.rejected_after_fatal == Some(true),
                    "abandoned puzzle accepted more input"
                );
                Ok(())
            }
            Outcome::Solved(_) => {
                ensure!(summary.fatal_events() == 0, "solved puzzle also went fatal");
                Ok(())
            }
            Outcome::Halted => bail!("try ceiling never fired in {} steps", summary.steps),
        });
    TestScenario::new(
        "try-ceiling",
        "Try Ceiling",
        "A low try limit abandons the puzzle and locks it",
        plan,
    )
}

fn deterministic_replay() -> TestScenario {
    let plan = SimulationPlan::new(SubjectStrategy::DialExplorer)
        .with_replay_check()
        .with_expectation(|summary| {
            ensure!(
                summary.replay_fingerprint == Some(summary.fingerprint),
                "replay fingerprint {:?} differs from {:016x}",
                summary.replay_fingerprint,
                summary.fingerprint
            );
            Ok(())
        });
    TestScenario::new(
        "deterministic-replay",
        "Deterministic Replay",
        "The same seed reproduces the same transcript",
        plan,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_resolves() {
        for key in SCENARIO_KEYS {
            let scenario = get_scenario(key).unwrap();
            assert_eq!(scenario.key, key);
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert!(get_scenario("missing").is_none());
        assert_eq!(list_scenarios().len(), SCENARIO_KEYS.len());
    }
}
