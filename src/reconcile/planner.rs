// Reconciliation planner (§4.3): a pure function, no mutation, no I/O.
// Computes an ordered, idempotent action list that converges local
// install state to a declared manifest.

use crate::reconcile::types::{Action, InitSystem, Manifest, State, Step};

pub fn reconcile(manifest: &Manifest, state: &State) -> Vec<Step> {
    let mut steps = Vec::new();

    for dir in &manifest.dirs {
        let exists = state.dirs_exist.get(dir).copied().unwrap_or(false);
        if !exists {
            steps.push(Step {
                action: Action::CreateDir,
                path: dir.clone(),
                content: None,
                mode: 0o755,
            });
        }
    }

    if !state.binary_exists || !state.binary_matches_hash {
        steps.push(Step {
            action: Action::CopyBinary,
            path: manifest.binary_path.clone(),
            content: None,
            mode: 0o755,
        });
    }

    let service_file_mode = if manifest.init_system == InitSystem::SysV { 0o755 } else { 0o644 };
    steps.push(Step {
        action: Action::WriteFile,
        path: manifest.service_file_path.clone(),
        content: Some(manifest.service_file_content.clone()),
        mode: service_file_mode,
    });

    if !state.config_exists {
        steps.push(Step {
            action: Action::WriteFile,
            path: manifest.config_path.clone(),
            content: Some(manifest.config_content.clone()),
            mode: 0o644,
        });
    }

    if !state.service_enabled {
        steps.push(Step {
            action: Action::EnableService,
            path: manifest.service_file_path.clone(),
            content: None,
            mode: 0,
        });
    }

    if !state.service_running {
        steps.push(Step {
            action: Action::StartService,
            path: manifest.service_file_path.clone(),
            content: None,
            mode: 0,
        });
    }

    steps
}

/// Applies a planner output to a `State` in memory, mirroring what the
/// real executor's side effects would leave behind. Used by tests to
/// assert the idempotence property in §8 without a real filesystem.
pub fn apply_to_state(manifest: &Manifest, steps: &[Step], state: &State) -> State {
    let mut next = state.clone();
    for step in steps {
        match step.action {
            Action::CreateDir => {
                next.dirs_exist.insert(step.path.clone(), true);
            }
            Action::CopyBinary => {
                next.binary_exists = true;
                next.binary_matches_hash = true;
            }
            Action::WriteFile => {
                if step.path == manifest.config_path {
                    next.config_exists = true;
                }
                // service file is always rewritten; no state flag tracks its content.
            }
            Action::EnableService => next.service_enabled = true,
            Action::StartService => next.service_running = true,
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_manifest(init_system: InitSystem) -> Manifest {
        Manifest {
            init_system,
            binary_path: PathBuf::from("/opt/agent/bin/svc"),
            service_file_path: PathBuf::from("/etc/systemd/system/svc.service"),
            service_file_content: "[Unit]\n".to_string(),
            config_path: PathBuf::from("/etc/codedeploy-agent/conf/codedeployagent.yml"),
            config_content: ":config: {}\n".to_string(),
            service_name: "svc".to_string(),
            dirs: vec![
                PathBuf::from("/opt/agent"),
                PathBuf::from("/opt/agent/bin"),
                PathBuf::from("/var/log/agent"),
                PathBuf::from("/opt/agent/deployment-root"),
            ],
        }
    }

    #[test]
    fn clean_state_produces_nine_steps_in_fixed_order() {
        let manifest = sample_manifest(InitSystem::Systemd);
        let state = State::default();

        let steps = reconcile(&manifest, &state);

        assert_eq!(steps.len(), 9);
        for step in &steps[0..4] {
            assert_eq!(step.action, Action::CreateDir);
        }
        assert_eq!(steps[4].action, Action::CopyBinary);
        assert_eq!(steps[4].mode, 0o755);
        assert_eq!(steps[5].action, Action::WriteFile);
        assert_eq!(steps[5].path, manifest.service_file_path);
        assert_eq!(steps[5].mode, 0o644);
        assert_eq!(steps[6].action, Action::WriteFile);
        assert_eq!(steps[6].path, manifest.config_path);
        assert_eq!(steps[6].mode, 0o644);
        assert_eq!(steps[7].action, Action::EnableService);
        assert_eq!(steps[8].action, Action::StartService);
    }

    #[test]
    fn sysv_service_file_is_mode_0755() {
        let manifest = sample_manifest(InitSystem::SysV);
        let state = State::default();
        let steps = reconcile(&manifest, &state);
        let service_write = steps
            .iter()
            .find(|s| s.action == Action::WriteFile && s.path == manifest.service_file_path)
            .unwrap();
        assert_eq!(service_write.mode, 0o755);
    }

    #[test]
    fn fully_installed_state_yields_only_service_file_rewrite() {
        let manifest = sample_manifest(InitSystem::Systemd);
        let mut state = State::default();
        for dir in &manifest.dirs {
            state.dirs_exist.insert(dir.clone(), true);
        }
        state.binary_exists = true;
        state.binary_matches_hash = true;
        state.config_exists = true;
        state.service_enabled = true;
        state.service_running = true;

        let steps = reconcile(&manifest, &state);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, Action::WriteFile);
        assert_eq!(steps[0].path, manifest.service_file_path);
    }

    #[test]
    fn idempotence_after_applying_full_plan() {
        let manifest = sample_manifest(InitSystem::Systemd);
        let state = State::default();
        let first_steps = reconcile(&manifest, &state);
        let next_state = apply_to_state(&manifest, &first_steps, &state);

        let second_steps = reconcile(&manifest, &next_state);

        assert_eq!(second_steps.len(), 1);
        assert_eq!(second_steps[0].action, Action::WriteFile);
        assert_eq!(second_steps[0].path, manifest.service_file_path);
    }

    #[test]
    fn ordering_holds_across_arbitrary_partial_states() {
        let manifest = sample_manifest(InitSystem::Systemd);
        let mut state = State::default();
        state.dirs_exist.insert(manifest.dirs[0].clone(), true);
        state.binary_exists = true;
        state.binary_matches_hash = false;

        let steps = reconcile(&manifest, &state);

        let create_dir_positions: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.action == Action::CreateDir)
            .map(|(i, _)| i)
            .collect();
        let copy_binary_pos = steps.iter().position(|s| s.action == Action::CopyBinary).unwrap();
        let service_write_pos = steps
            .iter()
            .position(|s| s.action == Action::WriteFile && s.path == manifest.service_file_path)
            .unwrap();
        let enable_pos = steps.iter().position(|s| s.action == Action::EnableService).unwrap();
        let start_pos = steps.iter().position(|s| s.action == Action::StartService).unwrap();

        assert!(create_dir_positions.iter().all(|&p| p < copy_binary_pos));
        assert!(copy_binary_pos < service_write_pos);
        assert!(service_write_pos < enable_pos);
        assert!(enable_pos < start_pos);
    }
}
