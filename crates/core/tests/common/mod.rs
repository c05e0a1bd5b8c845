#![allow(dead_code)]

use std::rc::Rc;

use actstats_core::activity::SharedActivity;
use actstats_core::context::StatsContext;
use actstats_core::service::LocalStatsService;
use actstats_core::store::{OpenMode, ResourcesDb};
use tempfile::TempDir;

pub const APPLICATION: &str = "KActivitiesStatsTest";
pub const CURRENT_ACTIVITY: &str = "activity1";

/// Usage data shared by the result set tests. `activity1` is the current
/// activity and the application runs as `KActivitiesStatsTest`.
const SEED: &str = "
INSERT INTO ResourceScoreCache
    (usedActivity, initiatingAgent, targettedResource, scoreType, cachedScore, firstUpdate, lastUpdate)
VALUES
      ('activity1', 'gvim',                 '/path/high1_act1_gvim', 0, 800, -1, 1421446599)
    , ('activity2', 'kate',                 '/path/high2_act2_kate', 0, 700, -1, 1421439442)
    , ('activity1', 'kate',                 '/path/high3_act1_kate', 0, 600, -1, 1421439442)
    , ('activity1', 'gvim',                 '/path/high4_act1_gvim', 0, 500, -1, 1421446488)
    , ('activity1', 'KActivitiesStatsTest', '/path/high5_act1_kast', 0, 400, -1, 1421446599)
    , ('activity2', 'KActivitiesStatsTest', '/path/high6_act2_kast', 0, 300, -1, 1421439442)
    , ('activity1', 'KActivitiesStatsTest', '/path/high7_act1_kast', 0, 200, -1, 1421439442)
    , ('activity1', 'KActivitiesStatsTest', '/path/high8_act1_kast', 0, 100, -1, 1421446488)
    , ('activity1', 'gvim',                 '/path/mid1_act1_gvim',  0, 17,  -1, 1421433419)
    , ('activity1', 'gvim',                 '/path/mid2_act1_gvim',  0, 54,  -1, 1421431630)
    , ('activity2', 'gvim',                 '/path/mid3_act2_gvim',  0, 8,   -1, 1421433172)
    , ('activity2', 'gvim',                 '/path/mid4_act2_gvim',  0, 8,   -1, 1421432545)
    , ('activity2', 'gvim',                 '/path/mid5_act2_gvim',  0, 79,  -1, 1421439118)
    , ('activity1', ':global',              '/path/mid6_act1_glob',  0, 20,  -1, 1421439331)
    , ('activity1', ':global',              '/path/mid7_act1_glob',  0, 8,   -1, 0)
    , ('activity1', ':global',              '/path/mid8_act1_glob',  0, 7,   -1, 1421432617)
    , ('activity1', 'gvim',                 '/path/low3_act1_gvim',  0, 6,   -1, 1421434704)
    , ('activity1', 'kate',                 '/path/low2_act1_kate',  0, 3,   -1, 1421433266)
    , ('activity1', 'kate',                 '/path/low1_act1_kate',  0, 2,   -1, 1421433254);

-- 15 and 14 January 2015
INSERT INTO ResourceEvent (usedActivity, initiatingAgent, targettedResource, start, end)
VALUES
      ('activity1', 'gvim', '/path/high1_act1_gvim', 1421345799, 1421345799)
    , ('activity2', 'kate', '/path/high2_act2_kate', 1421259377, 1421259377);

INSERT INTO ResourceInfo (targettedResource, title, mimetype, autoTitle, autoMimetype)
VALUES
      ('/path/high1_act1_gvim', 'high1_act1_gvim', 'text/plain', 1, 1)
    , ('/path/high2_act2_kate', 'high2_act2_kate', 'text/plain', 1, 1);

INSERT INTO ResourceLink (usedActivity, initiatingAgent, targettedResource)
VALUES
      ('activity1', 'gvim', '/path/mid1_a1')
    , ('activity1', 'gvim', '/path/mid2_a1')
    , ('activity2', 'gvim', '/path/mid3_a2')
    , ('activity2', 'gvim', '/path/mid4_a2')
    , ('activity2', 'gvim', '/path/link5_a2')
    , ('activity1', 'kate', '/path/link6_a1')
    , ('activity1', 'kate', '/path/link7_a1')
    , ('activity1', 'kate', '/path/link8_a1');
";

pub struct Fixture {
    pub dir: TempDir,
    pub db: Rc<ResourcesDb>,
    pub activity: Rc<SharedActivity>,
}

impl Fixture {
    /// Empty database on disk.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = ResourcesDb::open(&dir.path().join("database"), OpenMode::ReadWrite).unwrap();
        Self {
            dir,
            db: Rc::new(db),
            activity: Rc::new(SharedActivity::with_current(CURRENT_ACTIVITY)),
        }
    }

    /// Database seeded with the shared usage data.
    pub fn seeded() -> Self {
        let fixture = Self::empty();
        fixture.db.connection().execute_batch(SEED).unwrap();
        fixture
    }

    pub fn exec(&self, sql: &str) {
        self.db.connection().execute_batch(sql).unwrap();
    }

    pub fn ctx(&self) -> StatsContext {
        StatsContext::new(APPLICATION, self.activity.clone(), Some(self.db.clone()))
    }

    pub fn service(&self) -> Rc<LocalStatsService> {
        Rc::new(LocalStatsService::new(self.db.clone(), self.activity.clone(), APPLICATION))
    }
}
