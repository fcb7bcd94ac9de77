use prodplan_model::{PlanError, RunConfig, RunOutcome, Runner, SolverEngine, build, report, scenario};
use prodplan_solver::{
    ConstraintInfo, LpProblem, Method, Params, Session, SolutionStatus, SolverError, VariableInfo,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Reset,
    Configure(Method, bool),
    Solve,
}

/// Wraps a real session, records every call and fails on chosen methods
struct StubEngine {
    inner: Session,
    calls: Vec<Call>,
    method: Method,
    error_on: Vec<Method>,
    infeasible_on: Vec<Method>,
}

impl StubEngine {
    fn new() -> Self {
        Self {
            inner: Session::new(),
            calls: Vec::new(),
            method: Method::PrimalSimplex,
            error_on: Vec::new(),
            infeasible_on: Vec::new(),
        }
    }
}

impl SolverEngine for StubEngine {
    fn configure(&mut self, params: Params) {
        self.calls.push(Call::Configure(params.method, params.output));
        self.method = params.method;
        self.inner.configure(params);
    }

    fn reset(&mut self) {
        self.calls.push(Call::Reset);
        self.inner.reset();
    }

    fn solve(&mut self, problem: &LpProblem) -> Result<SolutionStatus, SolverError> {
        self.calls.push(Call::Solve);
        if self.error_on.contains(&self.method) {
            return Err(SolverError::NonFiniteCoefficient("objective".to_string()));
        }
        if self.infeasible_on.contains(&self.method) {
            return Ok(SolutionStatus::Infeasible);
        }
        self.inner.optimize(problem)
    }

    fn objective_value(&self) -> Result<f64, SolverError> {
        self.inner.objective_value()
    }

    fn variable(&self, index: usize) -> Result<&VariableInfo, SolverError> {
        self.inner.variable(index)
    }

    fn constraint(&self, index: usize) -> Result<&ConstraintInfo, SolverError> {
        self.inner.constraint(index)
    }
}

fn brewery() -> prodplan_model::PlanningModel {
    let (resources, products) = scenario::brewery().into_catalogs().unwrap();
    build(&resources, &products).unwrap()
}

#[test]
fn test_engine_is_reset_and_configured_before_every_solve() {
    let model = brewery();
    let mut runner = Runner::with_engine(StubEngine::new(), RunConfig::default());
    let algorithms = [Method::DualSimplex, Method::Barrier];
    runner.run_all(&model, &algorithms);

    assert_eq!(
        runner.engine().calls,
        vec![
            Call::Reset,
            Call::Configure(Method::DualSimplex, false),
            Call::Solve,
            Call::Reset,
            Call::Configure(Method::Barrier, false),
            Call::Solve,
        ]
    );
}

#[test]
fn test_engine_error_is_recorded_and_batch_continues() {
    let model = brewery();
    let mut engine = StubEngine::new();
    engine.error_on.push(Method::Barrier);
    let mut runner = Runner::with_engine(engine, RunConfig::default());

    let runs = runner.run(&model);
    assert_eq!(runs.len(), 6);
    assert_eq!(runs[2].algorithm, Method::Barrier);
    assert_eq!(
        runs[2].outcome,
        RunOutcome::EngineFailed(SolverError::NonFiniteCoefficient("objective".to_string()))
    );
    assert!(runs.iter().filter(|r| r.outcome.is_solved()).count() == 5);

    assert_eq!(
        report(&model, &runs[2]),
        Err(PlanError::ReportOnNonOptimal(None))
    );
}

#[test]
fn test_non_optimal_status_skips_reading_results() {
    let model = brewery();
    let mut engine = StubEngine::new();
    engine.infeasible_on.push(Method::PrimalSimplex);
    let mut runner = Runner::with_engine(engine, RunConfig::default());

    let runs = runner.run_all(&model, &[Method::PrimalSimplex, Method::DualSimplex]);
    assert_eq!(runs[0].outcome, RunOutcome::NotOptimal(SolutionStatus::Infeasible));
    assert!(runs[1].outcome.is_solved());
    assert_eq!(
        report(&model, &runs[0]),
        Err(PlanError::ReportOnNonOptimal(Some(SolutionStatus::Infeasible)))
    );
}

#[test]
fn test_engine_output_follows_config() {
    let model = brewery();
    let config = RunConfig {
        output: true,
        algorithms: vec![Method::PrimalSimplex],
        ..RunConfig::default()
    };
    let mut runner = Runner::with_engine(StubEngine::new(), config);
    runner.run(&model);

    assert!(runner.engine().calls.contains(&Call::Configure(Method::PrimalSimplex, true)));
}
