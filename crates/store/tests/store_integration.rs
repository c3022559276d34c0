use chrono::{NaiveDate, TimeZone, Utc};
use shouban_core::store::port::{CandidateStore, OrderLedger};
use shouban_core::strategy::entity::CandidateList;
use shouban_store::candidate::JsonCandidateStore;
use shouban_store::config::set_root_dir;
use shouban_store::ledger::JsonOrderLedger;
use tempfile::tempdir;

#[tokio::test]
async fn test_store_full_integration() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let root_path = tmp_dir.path().to_path_buf();
    set_root_dir(root_path.clone());

    // 2. 候选清单：写入 -> 物理文件存在 -> 重读保序
    let store = JsonCandidateStore::new();
    let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
    let list = CandidateList::new(
        date,
        vec!["300001.SZ".to_string(), "600000.SH".to_string()],
        1_765_100_000,
    );
    store.save(&list).await.unwrap();

    assert!(root_path.join("candidate.json").exists());

    let loaded = store.load_latest().await.unwrap().expect("snapshot present");
    assert_eq!(loaded.date, date);
    assert_eq!(loaded.candidates, vec!["300001.SZ", "600000.SH"]);
    assert_eq!(loaded.count, 2);

    // 3. 挂单台账：标记 -> 落盘 -> 重启后仍然拦截同日重复挂单
    // 13:00 UTC == 21:00 北京时间，夜间挂单时刻
    let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 0, 30).single().unwrap();
    {
        let ledger = JsonOrderLedger::load().await.unwrap();
        ledger.mark_placed("300001.SZ", now).await.unwrap();
    }
    assert!(root_path.join("order_cache.json").exists());

    let ledger = JsonOrderLedger::load().await.unwrap();
    assert!(ledger.already_placed("300001.SZ", "20260807").await.unwrap());
    assert!(!ledger.already_placed("600000.SH", "20260807").await.unwrap());
}
