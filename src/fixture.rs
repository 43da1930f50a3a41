//! Fixtures for tests

use crate::project::{BenefitStream, Project, ProjectBasics, ProjectInputs};
use crate::rate_base::CostOfCapital;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A 100 MW / 4 h project over 20 years with two benefit streams and default costs
#[fixture]
pub fn project_inputs() -> ProjectInputs {
    let basics = ProjectBasics {
        name: "Test Project".into(),
        project_id: "TEST-001".into(),
        location: "SCE".into(),
        ..Default::default()
    };
    let capacity_kw = basics.capacity_kw();
    let years = basics.analysis_period_years;

    ProjectInputs {
        benefits: vec![
            BenefitStream::escalating("Resource Adequacy", 120.0, 0.02, capacity_kw, years),
            BenefitStream::escalating("Energy Arbitrage", 60.0, 0.02, capacity_kw, years),
        ],
        basics,
        ..Default::default()
    }
}

#[fixture]
pub fn project(project_inputs: ProjectInputs) -> Project {
    Project::new(project_inputs).unwrap()
}

#[fixture]
pub fn cost_of_capital() -> CostOfCapital {
    CostOfCapital::default()
}
