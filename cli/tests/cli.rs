#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::os::unix::fs::MetadataExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const ENOENT: i32 = 2;

    fn write_config(dir: &Path) -> PathBuf {
        let config = serde_json::json!({
            "catalog": "sqlite",
            "registry": "journal",
            "database": dir.join("telefs.db"),
            "journal": dir.join("mapping.journal"),
            "store": { "path": dir.join("storage"), "compression": true, "chunk_size": 16 }
        });
        let path = dir.join("telefs.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
        path
    }

    fn telefs(config: &Path) -> Command {
        let mut cmd = Command::cargo_bin("telefs-cli").unwrap();
        if let Some(dir) = config.parent() {
            cmd.current_dir(dir);
        }
        cmd.arg("--config").arg(config);
        cmd
    }

    #[test]
    fn test_put_cat_list_rm() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let local = dir.path().join("notes_2024.txt");
        std::fs::write(&local, "remember the milk").unwrap();

        telefs(&config)
            .args(["put", "--file"])
            .arg(&local)
            .assert()
            .success()
            .stdout(predicate::str::contains("wrote 17 bytes to notes_2024.txt"));

        telefs(&config)
            .args(["cat", "notes_2024.txt"])
            .assert()
            .success()
            .stdout("remember the milk");

        telefs(&config)
            .args(["cat", "notes_2024.txt", "--offset", "9", "--size", "3"])
            .assert()
            .success()
            .stdout("the");

        telefs(&config)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("notes_2024.txt\t17\t#notes"));

        telefs(&config).args(["rm", "notes_2024.txt"]).assert().success();

        telefs(&config)
            .args(["cat", "notes_2024.txt"])
            .assert()
            .failure()
            .code(ENOENT);
    }

    #[test]
    fn test_touch_then_stat_reports_empty_file() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        telefs(&config).args(["touch", "draft"]).assert().success();
        telefs(&config)
            .args(["stat", "draft"])
            .assert()
            .success()
            .stdout(predicate::str::contains("size=0"));

        let owner = std::fs::metadata(dir.path()).unwrap();
        telefs(&config)
            .args(["stat", "draft"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("uid={} gid={}", owner.uid(), owner.gid())));

        telefs(&config).args(["touch", "draft"]).assert().failure();
        telefs(&config)
            .args(["touch", "#draft"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid name"));
    }

    #[test]
    fn test_rm_tag_group() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        for name in ["photo_1.jpg", "photo_2.jpg", "video_1.mp4"] {
            let local = dir.path().join(name);
            std::fs::write(&local, name).unwrap();
            telefs(&config).args(["put", "--file"]).arg(&local).assert().success();
        }

        telefs(&config).args(["rm", "#photo"]).assert().success();

        telefs(&config)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("video_1.mp4").and(predicate::str::contains("photo").not()));

        telefs(&config).args(["rm", "#photo"]).assert().failure();
    }
}
