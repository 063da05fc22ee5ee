//! Integration tests for the graph store, cycle guard, metrics, search,
//! permissions, and user management.
//!
//! All tests run against an in-memory SQLite database through the service
//! layer, the same path production callers use.

use taskdag::db::Database;
use taskdag::error::ErrorCode;
use taskdag::service::TaskService;
use taskdag::types::{Actor, NewTask, Role, TaskPatch, TaskStatus};

/// Fresh in-memory service with a bootstrapped admin actor.
fn setup() -> (TaskService, Actor) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let service = TaskService::new(db);
    let admin = service
        .bootstrap_admin("admin", "secret")
        .expect("bootstrap failed")
        .expect("expected a fresh database");
    (
        service,
        Actor {
            id: admin.id,
            role: Role::Admin,
        },
    )
}

/// Create a developer account and return it as an actor.
fn developer(service: &TaskService, admin: &Actor, name: &str) -> Actor {
    let user = service
        .add_user(admin, name, "pw", "developer")
        .expect("add_user failed");
    Actor {
        id: user.id,
        role: user.role,
    }
}

/// Create a task and return its id.
fn create(service: &TaskService, actor: &Actor, title: &str, parents: &[&str]) -> String {
    service
        .create_task(
            actor,
            NewTask {
                title: title.to_string(),
                description: None,
                parent_ids: parents.iter().map(|s| s.to_string()).collect(),
            },
        )
        .expect("create_task failed")
        .id
}

fn set_status(service: &TaskService, actor: &Actor, id: &str, status: TaskStatus) {
    service
        .update_task(
            actor,
            id,
            TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            },
        )
        .expect("status update failed");
}

mod graph_store_tests {
    use super::*;

    #[test]
    fn create_task_starts_not_started_with_empty_documentation() {
        let (service, admin) = setup();
        let id = create(&service, &admin, "Build renderer", &[]);

        let detail = service.get_task(&admin, &id).unwrap();
        assert_eq!(detail.view.status, TaskStatus::NotStarted);
        assert_eq!(detail.view.progress, 0);
        assert!(!detail.view.override_warning);
        assert_eq!(detail.documentation, "");
        assert!(detail.history.is_empty());

        // The empty documentation record exists from creation
        let doc = service.database().get_documentation(&id).unwrap().unwrap();
        assert_eq!(doc.content, "");
        assert!(doc.template_hint.contains("externally accessible features"));
    }

    #[test]
    fn create_with_unknown_parent_writes_nothing() {
        let (service, admin) = setup();

        let err = service
            .create_task(
                &admin,
                NewTask {
                    title: "Orphan".to_string(),
                    description: None,
                    parent_ids: vec!["no-such-task".to_string()],
                },
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
        assert!(service.list_tasks(&admin).unwrap().is_empty());
    }

    #[test]
    fn create_with_empty_title_is_rejected() {
        let (service, admin) = setup();
        let err = service
            .create_task(&admin, NewTask::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn create_attaches_and_dedupes_parent_edges() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = service
            .create_task(
                &admin,
                NewTask {
                    title: "B".to_string(),
                    description: None,
                    parent_ids: vec![a.clone(), a.clone()],
                },
            )
            .unwrap()
            .id;

        assert_eq!(service.database().parents_of(&b).unwrap(), vec![a.clone()]);
        assert_eq!(service.database().children_of(&a).unwrap(), vec![b]);
    }

    #[test]
    fn attach_parent_rejects_self_reference_and_duplicates() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);

        let err = service.add_parent(&admin, &a, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::SelfReference);

        let err = service.add_parent(&admin, &b, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateEdge);
    }

    #[test]
    fn detach_missing_edge_reports_edge_not_found() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[]);

        let err = service.remove_parent(&admin, &b, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::EdgeNotFound);
    }

    #[test]
    fn delete_with_children_is_blocked() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let _b = create(&service, &admin, "B", &[&a]);

        let err = service.delete_task(&admin, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::HasChildren);
        assert!(service.database().get_task(&a).unwrap().is_some());
    }

    #[test]
    fn delete_after_detaching_children_cascades_doc_and_history() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);

        // Accumulate a history entry and documentation on A
        set_status(&service, &admin, &b, TaskStatus::Functional);
        set_status(&service, &admin, &a, TaskStatus::Started);
        service
            .update_task(
                &admin,
                &a,
                TaskPatch {
                    documentation: Some("Spawning rules".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let err = service.delete_task(&admin, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::HasChildren);

        service.remove_parent(&admin, &b, &a).unwrap();
        service.delete_task(&admin, &a).unwrap();

        assert!(service.database().get_task(&a).unwrap().is_none());
        assert!(service.database().get_documentation(&a).unwrap().is_none());
        assert!(service.database().task_history(&a).unwrap().is_empty());
        // B survives
        assert!(service.database().get_task(&b).unwrap().is_some());
    }
}

mod cycle_guard_tests {
    use super::*;

    #[test]
    fn chain_cycle_is_rejected() {
        // A -> B -> C, then attempt to add C as a parent of A
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);
        let c = create(&service, &admin, "C", &[&b]);

        let err = service.add_parent(&admin, &a, &c).unwrap_err();
        assert_eq!(err.code, ErrorCode::CycleDetected);
        assert!(service.database().parents_of(&a).unwrap().is_empty());
    }

    #[test]
    fn would_create_cycle_matches_ancestor_reachability() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);
        let c = create(&service, &admin, "C", &[&b]);
        let db = service.database();

        // C's ancestor set is {B, A}: attaching any of them under C cycles
        assert!(db.would_create_cycle(&a, &c).unwrap());
        assert!(db.would_create_cycle(&b, &c).unwrap());
        assert!(db.would_create_cycle(&a, &a).unwrap());
        // The other direction is fine
        assert!(!db.would_create_cycle(&c, &a).unwrap());
    }

    #[test]
    fn diamond_shapes_are_legal() {
        // A -> B, A -> C, then D with parents [B, C]
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);
        let c = create(&service, &admin, "C", &[&a]);
        let d = create(&service, &admin, "D", &[&b, &c]);

        let mut parents = service.database().parents_of(&d).unwrap();
        parents.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(parents, expected);
    }

    #[test]
    fn add_child_runs_the_same_guard() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);

        // B already descends from A; making A a child of B would cycle
        let err = service.add_child(&admin, &b, &a).unwrap_err();
        assert_eq!(err.code, ErrorCode::CycleDetected);
    }

    #[test]
    fn reparent_batch_with_cyclic_member_is_atomic() {
        let (service, admin) = setup();
        let a = create(&service, &admin, "A", &[]);
        let b = create(&service, &admin, "B", &[&a]);
        let other = create(&service, &admin, "Other", &[]);

        // Replacing A's parents with [other, B] must reject the whole batch:
        // B is a descendant of A.
        let err = service
            .update_task(
                &admin,
                &a,
                TaskPatch {
                    parent_ids: Some(vec![other.clone(), b.clone()]),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CycleDetected);
        assert!(service.database().parents_of(&a).unwrap().is_empty());
    }

    #[test]
    fn reparent_replaces_the_full_set() {
        let (service, admin) = setup();
        let p1 = create(&service, &admin, "P1", &[]);
        let p2 = create(&service, &admin, "P2", &[]);
        let t = create(&service, &admin, "T", &[&p1]);

        service
            .update_task(
                &admin,
                &t,
                TaskPatch {
                    parent_ids: Some(vec![p2.clone()]),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(service.database().parents_of(&t).unwrap(), vec![p2]);
        assert!(service.database().children_of(&p1).unwrap().is_empty());
    }
}

mod metrics_tests {
    use super::*;

    #[test]
    fn progress_is_floor_of_integrated_children_fraction() {
        let (service, admin) = setup();
        let p = create(&service, &admin, "Parent", &[]);
        let c1 = create(&service, &admin, "C1", &[&p]);
        let _c2 = create(&service, &admin, "C2", &[&p]);
        let _c3 = create(&service, &admin, "C3", &[&p]);

        // A leaf may jump straight to integrated when guards pass
        set_status(&service, &admin, &c1, TaskStatus::Integrated);

        let views = service.list_tasks(&admin).unwrap();
        let parent = views.iter().find(|v| v.id == p).unwrap();
        assert_eq!(parent.progress, 33);

        let leaf = views.iter().find(|v| v.id == c1).unwrap();
        assert_eq!(leaf.progress, 100);
    }

    #[test]
    fn depth_and_importance_from_snapshot() {
        let (service, admin) = setup();
        let root = create(&service, &admin, "Root", &[]);
        let mid = create(&service, &admin, "Mid", &[&root]);
        let l1 = create(&service, &admin, "L1", &[&mid]);
        let _l2 = create(&service, &admin, "L2", &[&mid]);
        // Diamond: L1 also hangs directly off the root
        service.add_parent(&admin, &l1, &root).unwrap();

        let g = service.graph_snapshot().unwrap();
        assert_eq!(g.depth(&root), 0);
        assert_eq!(g.depth(&mid), 1);
        assert_eq!(g.depth(&l1), 2);
        assert_eq!(g.importance_weight(&mid), 14); // depth 1, two children
        assert_eq!(g.importance_weight(&root), 4); // depth 0, two children
    }
}

mod permission_tests {
    use super::*;

    #[test]
    fn strangers_cannot_edit() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let carol = developer(&service, &admin, "carol");
        let t = create(&service, &alice, "Alice's task", &[]);

        let err = service
            .update_task(
                &carol,
                &t,
                TaskPatch {
                    title: Some("hijacked".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        // Admin and creator can
        service
            .update_task(
                &admin,
                &t,
                TaskPatch {
                    title: Some("renamed".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn assignee_gains_edit_but_not_delete() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let bob = developer(&service, &admin, "bob");
        let t = create(&service, &alice, "Shared task", &[]);

        service.assign_task(&admin, &t, Some(&bob.id)).unwrap();

        service
            .update_task(
                &bob,
                &t,
                TaskPatch {
                    description: Some("notes".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let err = service.delete_task(&bob, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn request_requires_unassigned_not_started() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let bob = developer(&service, &admin, "bob");
        let t = create(&service, &admin, "Open task", &[]);

        service.request_task(&alice, &t).unwrap();
        let view = service.get_task(&admin, &t).unwrap().view;
        assert_eq!(view.assignee.as_deref(), Some("alice"));

        // Already assigned
        let err = service.request_task(&bob, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        // Unassign, advance, then request fails on status
        service.unassign_task(&alice, &t).unwrap();
        set_status(&service, &admin, &t, TaskStatus::Started);
        let err = service.request_task(&bob, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn assignment_is_admin_only() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let bob = developer(&service, &admin, "bob");
        let t = create(&service, &admin, "Task", &[]);

        let err = service.assign_task(&alice, &t, Some(&bob.id)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        service.assign_task(&admin, &t, Some(&bob.id)).unwrap();
        // Clearing via assign(None) also works
        service.assign_task(&admin, &t, None).unwrap();
        let view = service.get_task(&admin, &t).unwrap().view;
        assert!(view.assignee.is_none());
    }

    #[test]
    fn unassign_allowed_for_admin_creator_or_assignee() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let bob = developer(&service, &admin, "bob");
        let carol = developer(&service, &admin, "carol");
        let t = create(&service, &alice, "Task", &[]);
        service.assign_task(&admin, &t, Some(&bob.id)).unwrap();

        let err = service.unassign_task(&carol, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        service.unassign_task(&bob, &t).unwrap();
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn duplicate_usernames_are_rejected() {
        let (service, admin) = setup();
        developer(&service, &admin, "alice");

        let err = service
            .add_user(&admin, "alice", "pw", "developer")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateUsername);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let (service, admin) = setup();
        let err = service
            .add_user(&admin, "eve", "pw", "superuser")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRole);
    }

    #[test]
    fn listing_reports_task_counts_and_is_admin_only() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        let t1 = create(&service, &alice, "T1", &[]);
        let _t2 = create(&service, &alice, "T2", &[]);
        service.assign_task(&admin, &t1, Some(&alice.id)).unwrap();

        let users = service.list_users(&admin).unwrap();
        let row = users.iter().find(|u| u.username == "alice").unwrap();
        assert_eq!(row.created_tasks_count, 2);
        assert_eq!(row.assigned_tasks_count, 1);

        let err = service.list_users(&alice).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn rename_checks_for_collisions() {
        let (service, admin) = setup();
        let alice = developer(&service, &admin, "alice");
        developer(&service, &admin, "bob");

        let err = service
            .update_user(&admin, &alice.id, Some("bob"), None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateUsername);

        service
            .update_user(&admin, &alice.id, Some("alicia"), Some("admin"))
            .unwrap();
        let user = service.database().get_user(&alice.id).unwrap().unwrap();
        assert_eq!(user.username, "alicia");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn self_deletion_is_forbidden() {
        let (service, admin) = setup();
        let err = service.delete_user(&admin, &admin.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn bootstrap_runs_once() {
        let (service, _admin) = setup();
        let second = service.bootstrap_admin("admin2", "pw").unwrap();
        assert!(second.is_none());
    }
}

mod search_tests {
    use super::*;

    #[test]
    fn matches_title_and_description_case_insensitively() {
        let (service, admin) = setup();
        let t1 = service
            .create_task(
                &admin,
                NewTask {
                    title: "Weapon system".to_string(),
                    description: Some("hitscan and projectiles".to_string()),
                    parent_ids: vec![],
                },
            )
            .unwrap()
            .id;
        let _t2 = create(&service, &admin, "Level editor", &[]);

        let hits = service.search(&admin, "WEAPON").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, t1);

        let hits = service.search(&admin, "Projectile").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, t1);

        assert!(service.search(&admin, "netcode").unwrap().is_empty());
        assert!(service.search(&admin, "").unwrap().is_empty());
    }

    #[test]
    fn hits_carry_truncated_description_and_doc_excerpt() {
        let (service, admin) = setup();
        let long_desc = "d".repeat(300);
        let long_doc = "x".repeat(500);
        let t = service
            .create_task(
                &admin,
                NewTask {
                    title: "Audio mixer".to_string(),
                    description: Some(long_desc),
                    parent_ids: vec![],
                },
            )
            .unwrap()
            .id;
        service
            .update_task(
                &admin,
                &t,
                TaskPatch {
                    documentation: Some(long_doc),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let hits = service.search(&admin, "audio").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description.chars().count(), 100);
        assert_eq!(hits[0].doc_preview.chars().count(), 200);
    }

    #[test]
    fn like_wildcards_match_literally() {
        let (service, admin) = setup();
        let t = create(&service, &admin, "50%_done milestone", &[]);
        let _other = create(&service, &admin, "500 dings", &[]);

        let hits = service.search(&admin, "50%_d").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, t);
    }
}

mod persistence_tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn on_disk_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("tracker.db");

        let id = {
            let db = Database::open(&path).unwrap();
            let service = TaskService::new(db);
            let admin = service
                .bootstrap_admin("admin", "secret")
                .unwrap()
                .expect("expected a fresh database");
            let admin = Actor {
                id: admin.id,
                role: Role::Admin,
            };
            create(&service, &admin, "Persisted", &[])
        };

        // Reopening re-runs migrations against the existing schema and
        // finds the prior state intact.
        let db = Database::open(&path).unwrap();
        let task = db.get_task(&id).unwrap().expect("task lost on reopen");
        assert_eq!(task.title, "Persisted");
        assert_eq!(task.status, TaskStatus::NotStarted);
    }

    #[test]
    fn mutations_bump_updated_at() {
        let (service, admin) = setup();
        let p = create(&service, &admin, "Parent", &[]);
        let c = create(&service, &admin, "Child", &[]);

        let stamp = |id: &str| service.database().get_task(id).unwrap().unwrap().updated_at;

        let before = stamp(&c);
        sleep(Duration::from_millis(5));
        service
            .update_task(
                &admin,
                &c,
                TaskPatch {
                    description: Some("now with details".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        let after_edit = stamp(&c);
        assert!(after_edit > before);

        sleep(Duration::from_millis(5));
        set_status(&service, &admin, &c, TaskStatus::Started);
        let after_status = stamp(&c);
        assert!(after_status > after_edit);

        // Attaching a parent touches the child, not the parent
        let parent_before = stamp(&p);
        sleep(Duration::from_millis(5));
        service.add_parent(&admin, &c, &p).unwrap();
        assert!(stamp(&c) > after_status);
        assert_eq!(stamp(&p), parent_before);
    }
}
