pub mod orchestration;

pub use orchestration::{
    parse_commit_list, ActionOutcome, ActionRequest, CandidateSource, ReleasePlan,
    ReleaseTrainController, TrainSettings,
};
