//! Reconciliation against an in-process store
//!
//! Covers idempotence, change detection and the on-disk result of a write.

mod common;

use certwatch::config::Component;
use common::{system_time, ts, Harness};

mod idempotence_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Key, b"KEY", ts(1_700_000_000));
        h.put("example.com", Component::Crt, b"CRT", ts(1_700_000_000));

        assert!(h.reconciler.reconcile_all().await.unwrap());
        let before = std::fs::metadata(h.path("example.com", Component::Crt)).unwrap();

        assert!(!h.reconciler.reconcile_all().await.unwrap());
        let after = std::fs::metadata(h.path("example.com", Component::Crt)).unwrap();
        assert_eq!(before.modified().unwrap(), after.modified().unwrap());

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            assert_eq!(before.ino(), after.ino());
        }
    }

    #[tokio::test]
    async fn test_fractional_modified_time_is_stable() {
        let h = Harness::new(&["example.com"]);
        let modified = ts(1_700_000_000) + chrono::Duration::nanoseconds(123_456_789);
        h.put("example.com", Component::Crt, b"CRT", modified);

        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert!(!h.reconciler.reconcile("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_store_changes_nothing() {
        let h = Harness::new(&["example.com", "other.org"]);
        assert!(!h.reconciler.reconcile_all().await.unwrap());
        assert!(!h.path("example.com", Component::Crt).exists());
    }
}

mod change_detection_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_modified_time_rewrites() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Crt, b"ABC", ts(1_700_000_000));
        h.reconciler.reconcile("example.com").await.unwrap();

        h.put("example.com", Component::Crt, b"ABC", ts(1_700_000_100));
        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(
            h.mtime("example.com", Component::Crt),
            system_time(ts(1_700_000_100))
        );
    }

    #[tokio::test]
    async fn test_sub_second_modified_change_rewrites() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Crt, b"ABC", ts(1_700_000_000));
        h.reconciler.reconcile("example.com").await.unwrap();

        let later = ts(1_700_000_000) + chrono::Duration::milliseconds(500);
        h.put("example.com", Component::Crt, b"ABC", later);
        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(h.mtime("example.com", Component::Crt), system_time(later));
        assert!(!h.reconciler.reconcile("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_new_length_rewrites() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Crt, b"ABC", ts(1_700_000_000));
        h.reconciler.reconcile("example.com").await.unwrap();

        h.put("example.com", Component::Crt, b"ABCDEF", ts(1_700_000_000));
        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(h.read("example.com", Component::Crt), b"ABCDEF");
    }

    #[tokio::test]
    async fn test_same_length_and_time_is_not_rewritten() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Crt, b"ABC", ts(1_700_000_000));
        h.reconciler.reconcile("example.com").await.unwrap();

        // size and mtime are the whole fingerprint
        h.put("example.com", Component::Crt, b"XYZ", ts(1_700_000_000));
        assert!(!h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(h.read("example.com", Component::Crt), b"ABC");
    }

    #[tokio::test]
    async fn test_locally_touched_file_is_restored() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Key, b"SECRET", ts(1_700_000_000));
        h.reconciler.reconcile("example.com").await.unwrap();

        std::fs::write(h.path("example.com", Component::Key), b"tampered").unwrap();
        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(h.read("example.com", Component::Key), b"SECRET");
    }
}

mod partial_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_key_written_before_crt_failure_is_reported_changed() {
        let h = Harness::new(&["a.example"]);
        h.put("a.example", Component::Key, b"KEY", ts(1_700_000_000));
        h.store
            .insert(&h.key("a.example", Component::Crt), "caddy-storage-redis{broken");

        let err = h.reconciler.reconcile_all().await.unwrap_err();
        assert_eq!(err.cert, "a.example");
        assert!(err.changed);
        assert_eq!(h.read("a.example", Component::Key), b"KEY");
    }
}

mod write_tests {
    use super::*;

    #[tokio::test]
    async fn test_content_and_mtime_match_store() {
        let h = Harness::new(&["example.com"]);
        let pem = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
        h.put("example.com", Component::Crt, pem, ts(1_700_000_042));

        h.reconciler.reconcile_all().await.unwrap();
        assert_eq!(h.read("example.com", Component::Crt), pem);
        assert_eq!(
            h.mtime("example.com", Component::Crt),
            system_time(ts(1_700_000_042))
        );
    }

    #[tokio::test]
    async fn test_value_without_prefix_still_decodes() {
        let h = Harness::new(&["example.com"]);
        let raw = certwatch::controller::codec::encode_stored_value(b"K", ts(1), "");
        h.store.insert(&h.key("example.com", Component::Key), raw);

        assert!(h.reconciler.reconcile("example.com").await.unwrap());
        assert_eq!(h.read("example.com", Component::Key), b"K");
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Key, b"K", ts(1_700_000_000));
        h.put("example.com", Component::Crt, b"C", ts(1_700_000_000));
        h.reconciler.reconcile_all().await.unwrap();

        let mut names: Vec<_> = std::fs::read_dir(&h.settings.cert_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["example.com.crt", "example.com.key"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_and_directory_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let h = Harness::new(&["example.com"]);
        h.put("example.com", Component::Key, b"K", ts(1_700_000_000));
        h.reconciler.reconcile_all().await.unwrap();

        let file_mode = std::fs::metadata(h.path("example.com", Component::Key))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);

        let dir_mode = std::fs::metadata(&h.settings.cert_dir)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
