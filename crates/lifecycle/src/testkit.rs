//! Small lifecycle used by the unit tests of this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::bail;

use crate::hooks::HookContext;
use crate::lifecycle::Lifecycle;
use crate::machine::{Label, Machine};
use crate::subject::Subject;
use crate::table::Rule;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Drafted,
    Stockroom,
    ReadyToList,
    Listed,
    Reserved,
    Lost,
    /// Never registered; stands in for corrupt stored data.
    Orphan,
}

impl Label for Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Drafted => "drafted",
            Stage::Stockroom => "stockroom",
            Stage::ReadyToList => "ready_to_list",
            Stage::Listed => "listed",
            Stage::Reserved => "reserved",
            Stage::Lost => "lost",
            Stage::Orphan => "orphan",
        }
    }

    fn all() -> &'static [Self] {
        &[
            Stage::Drafted,
            Stage::Stockroom,
            Stage::ReadyToList,
            Stage::Listed,
            Stage::Reserved,
            Stage::Lost,
            Stage::Orphan,
        ]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Receive,
    Prepare,
    Release,
    Reserve,
    Recheck,
    Delist,
    /// Never registered.
    Purge,
}

impl Label for Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Receive => "receive",
            Step::Prepare => "prepare",
            Step::Release => "release",
            Step::Reserve => "reserve",
            Step::Recheck => "recheck",
            Step::Delist => "delist",
            Step::Purge => "purge",
        }
    }

    fn all() -> &'static [Self] {
        &[
            Step::Receive,
            Step::Prepare,
            Step::Release,
            Step::Reserve,
            Step::Recheck,
            Step::Delist,
            Step::Purge,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestData {
    pub price: u32,
    /// Names of the hooks that ran, in order.
    pub notes: Vec<String>,
}

/// Switches the tests flip to steer guards and hooks.
#[derive(Debug, Default)]
pub struct TestServices {
    pub misplaced: AtomicBool,
    pub guard_error: AtomicBool,
    pub fail_after_commit: AtomicBool,
    pub panic_after_commit: AtomicBool,
    pub failing_hook: Mutex<Option<&'static str>>,
    pub slow_release: Mutex<Option<Duration>>,
    pub announced: Mutex<Vec<String>>,
}

impl TestServices {
    pub fn fail_hook(&self, name: &'static str) {
        *self.failing_hook.lock().unwrap() = Some(name);
    }

    fn should_fail(&self, name: &str) -> bool {
        *self.failing_hook.lock().unwrap() == Some(name)
    }

    pub fn announced(&self) -> Vec<String> {
        self.announced.lock().unwrap().clone()
    }
}

pub struct TestMachine;

impl Machine for TestMachine {
    type State = Stage;
    type Event = Step;
    type Data = TestData;
    type Services = TestServices;

    const ENTITY_TYPE: &'static str = "test_item";
}

type Ctx<'a> = HookContext<'a, TestMachine>;

fn tracked(
    name: &'static str,
) -> impl Fn(&mut Subject<TestMachine>, &Ctx<'_>) -> anyhow::Result<()> + Send + Sync + 'static {
    move |subject: &mut Subject<TestMachine>, ctx: &Ctx<'_>| {
        if ctx.services.should_fail(name) {
            bail!("{name} refused");
        }
        subject.data_mut().notes.push(name.to_string());
        Ok(())
    }
}

pub fn test_lifecycle() -> Lifecycle<TestMachine> {
    Lifecycle::<TestMachine>::builder()
        .guard("misplaced", |_, ctx| {
            Ok(ctx.services.misplaced.load(Ordering::SeqCst))
        })
        .guard("should_list", |subject, ctx| {
            if ctx.services.guard_error.load(Ordering::SeqCst) {
                bail!("listing service unreachable");
            }
            Ok(subject.flags().is_set("list"))
        })
        .guard("on_hold", |subject, _| Ok(subject.flags().is_set("hold")))
        .hook("check_release", |subject, ctx| {
            if let Some(delay) = *ctx.services.slow_release.lock().unwrap() {
                thread::sleep(delay);
            }
            tracked("check_release")(subject, ctx)
        })
        .hook("leave_stockroom", tracked("leave_stockroom"))
        .hook("before_list", tracked("before_list"))
        .hook("reprice", |subject, ctx| {
            tracked("reprice")(subject, ctx)?;
            subject.data_mut().price += 10;
            Ok(())
        })
        .hook("clear_hold", |subject, ctx| {
            tracked("clear_hold")(subject, ctx)?;
            subject.flags_mut().remove("hold");
            Ok(())
        })
        .hook("note_listing", tracked("note_listing"))
        .after_commit_hook("flaky", |_, services| {
            if services.fail_after_commit.load(Ordering::SeqCst) {
                bail!("broker offline");
            }
            Ok(())
        })
        .after_commit_hook("explosive", |_, services| {
            if services.panic_after_commit.load(Ordering::SeqCst) {
                panic!("after-commit hook blew up");
            }
            Ok(())
        })
        .after_commit_hook("announce", |committed, services| {
            services
                .announced
                .lock()
                .unwrap()
                .push(format!("{}->{}", committed.from.name(), committed.to.name()));
            Ok(())
        })
        .states([Stage::Drafted, Stage::ReadyToList, Stage::Reserved, Stage::Lost])
        .state(Stage::Stockroom, |s| {
            s.stamp_first_arrival().on_exit("leave_stockroom")
        })
        .state(Stage::Listed, |s| {
            s.before_enter("before_list")
                .on_enter("reprice")
                .stamp_first_arrival()
        })
        .event(Step::Receive, |e| {
            e.transition([Stage::Drafted], Stage::Stockroom)
                .after_commit("announce")
        })
        .event(Step::Prepare, |e| {
            e.transition([Stage::Stockroom], Stage::ReadyToList)
        })
        .event(Step::Release, |e| {
            e.before("check_release")
                .rule(Rule::new([Stage::Stockroom, Stage::ReadyToList], Stage::Lost).when("misplaced"))
                .rule(
                    Rule::new([Stage::Stockroom, Stage::ReadyToList], Stage::Listed)
                        .when("should_list")
                        .then("note_listing"),
                )
                .rule(Rule::new([Stage::Stockroom, Stage::ReadyToList], Stage::Stockroom))
                .after("clear_hold")
                .after_commit("flaky")
                .after_commit("explosive")
                .after_commit("announce")
        })
        .event(Step::Reserve, |e| {
            e.rule(Rule::new([Stage::Listed], Stage::Reserved).unless("on_hold"))
        })
        .event(Step::Recheck, |e| e.transition([Stage::Listed], Stage::Listed))
        .event(Step::Delist, |e| {
            e.transition([Stage::Listed, Stage::Reserved], Stage::Stockroom)
                .after_commit("announce")
        })
        .build()
        .expect("test lifecycle is valid")
}
