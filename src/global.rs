use once_cell::sync::OnceCell;

static SESSION_TIME: OnceCell<chrono::Duration> = OnceCell::new();

/// 12 hours, used when SESSION_TIME is absent from the environment.
const DEFAULT_SESSION_TIME_MINUTES: i64 = 720;

#[inline(always)]
pub fn get_session_time() -> &'static chrono::Duration {
    unsafe { SESSION_TIME.get_unchecked() }
}

pub fn init() {
    let minutes = match std::env::var("SESSION_TIME") {
        Ok(time) => {
            let time = time
                .parse::<i64>()
                .expect("SESSION_TIME cannot be parsed as an integer");
            if time <= 0 {
                panic!("SESSION_TIME must be a positive number of minutes!");
            }
            time
        }
        Err(_) => DEFAULT_SESSION_TIME_MINUTES,
    };
    SESSION_TIME
        .set(chrono::Duration::minutes(minutes))
        .expect("failed to set SESSION_TIME");
}
