//! Walking a setup provider into owned [`InstanceRecord`]s.
//!
//! The traits here are the seams between the collection logic and the COM
//! object graph. On Windows they are implemented by the wrappers in `setup`.
//! Any other provider, such as an in-memory fake, can implement them too.
//!
//! Collection is all-or-nothing: the first failing call aborts the walk and
//! whatever had been collected is dropped.

use std::ops::Deref;
use std::path::PathBuf;

use log::{debug, trace};
use windows_result::HRESULT;

use crate::error::{Error, REGDB_E_CLASSNOTREG};
use crate::record::{InstanceRecord, PackageRecord};

/// Something that can hand out a cursor over registered instances.
pub trait SetupSource {
    type Instances: InstanceCursor;

    fn instances(&self) -> Result<Self::Instances, HRESULT>;
}

/// A forward-only cursor yielding one instance per step.
pub trait InstanceCursor {
    type Instance: InstanceHandle;

    /// `Ok(None)` once the cursor is exhausted.
    fn next_instance(&mut self) -> Result<Option<Self::Instance>, HRESULT>;
}

pub trait InstanceHandle {
    type Package: PackageHandle;
    /// Owner of the package list. Dropping it releases the list.
    type Packages: Deref<Target = [Self::Package]>;

    fn instance_id(&self) -> Result<String, HRESULT>;
    fn display_name(&self) -> Result<String, HRESULT>;
    fn installation_version(&self) -> Result<String, HRESULT>;
    fn installation_path(&self) -> Result<PathBuf, HRESULT>;
    fn engine_path(&self) -> Result<PathBuf, HRESULT>;
    fn packages(&self) -> Result<Self::Packages, HRESULT>;
}

/// An element of an instance's package list.
pub trait PackageHandle {
    type Reference: PackageReference;

    /// Resolve the element to the object its fields are read from.
    /// Called once per package.
    fn reference(&self) -> Result<Self::Reference, HRESULT>;
}

pub trait PackageReference {
    fn id(&self) -> Result<String, HRESULT>;
    fn version(&self) -> Result<String, HRESULT>;
    fn kind(&self) -> Result<String, HRESULT>;
}

/// Connect to a provider and collect every instance it reports.
///
/// A provider that isn't registered (`REGDB_E_CLASSNOTREG`) means nothing is
/// installed, so that gives an empty list rather than an error.
pub fn enumerate_with<S, F>(connect: F) -> Result<Vec<InstanceRecord>, Error>
where
    S: SetupSource,
    F: FnOnce() -> Result<S, HRESULT>,
{
    let source = match connect() {
        Ok(source) => source,
        Err(REGDB_E_CLASSNOTREG) => {
            debug!("setup configuration is not registered, no instances installed");
            return Ok(Vec::new());
        }
        Err(hresult) => return Err(hresult.into()),
    };
    let mut cursor = source.instances()?;
    let instances = collect_instances(&mut cursor)?;
    debug!("found {} instance(s)", instances.len());
    Ok(instances)
}

/// Drain `cursor`, converting each instance in provider order.
pub fn collect_instances<C: InstanceCursor>(cursor: &mut C) -> Result<Vec<InstanceRecord>, Error> {
    let mut instances = Vec::new();
    while let Some(instance) = cursor.next_instance()? {
        instances.push(instance_record(&instance)?);
    }
    Ok(instances)
}

/// Read every field of one instance.
///
/// Fields are fetched in a fixed order: id, name, version, install path,
/// engine path, then packages.
pub fn instance_record<I: InstanceHandle>(instance: &I) -> Result<InstanceRecord, Error> {
    let instance_id = instance.instance_id()?;
    trace!("reading instance {instance_id}");
    let display_name = instance.display_name()?;
    let version = instance.installation_version()?;
    let install_path = instance.installation_path()?;
    let engine_path = instance.engine_path()?;
    let packages = collect_packages(instance)?;
    Ok(InstanceRecord {
        instance_id,
        display_name,
        version,
        install_path,
        engine_path,
        packages,
    })
}

/// Convert an instance's package list into records.
///
/// The list owner is dropped on every path out of this function.
pub fn collect_packages<I: InstanceHandle>(instance: &I) -> Result<Vec<PackageRecord>, Error> {
    let packages = instance.packages()?;
    let records = packages
        .iter()
        .map(package_record)
        .collect::<Result<Vec<_>, _>>()?;
    trace!("{} package(s)", records.len());
    Ok(records)
}

pub fn package_record<P: PackageHandle>(package: &P) -> Result<PackageRecord, HRESULT> {
    let package = package.reference()?;
    Ok(PackageRecord {
        id: package.id()?,
        version: package.version()?,
        kind: package.kind()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{E_POINTER, E_UNEXPECTED};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Which call a fake should fail.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub(crate) enum Step {
        Connect,
        Instances,
        Next,
        Id,
        Name,
        Version,
        Path,
        Engine,
        Packages,
        PackageReference,
        PackageType,
    }

    const FAILURE: HRESULT = E_UNEXPECTED;

    #[derive(Clone)]
    pub(crate) struct FakePackage {
        id: String,
        fail: Option<Step>,
        resolved: Rc<Cell<usize>>,
    }

    impl PackageHandle for FakePackage {
        type Reference = FakePackage;

        fn reference(&self) -> Result<FakePackage, HRESULT> {
            self.resolved.set(self.resolved.get() + 1);
            match self.fail {
                Some(Step::PackageReference) => Err(FAILURE),
                _ => Ok(self.clone()),
            }
        }
    }

    impl PackageReference for FakePackage {
        fn id(&self) -> Result<String, HRESULT> {
            Ok(self.id.clone())
        }
        fn version(&self) -> Result<String, HRESULT> {
            Ok("17.9.34511.75".into())
        }
        fn kind(&self) -> Result<String, HRESULT> {
            match self.fail {
                Some(Step::PackageType) => Err(FAILURE),
                _ => Ok("Component".into()),
            }
        }
    }

    /// Package list that counts how often it was released.
    pub(crate) struct FakePackages {
        packages: Vec<FakePackage>,
        released: Rc<Cell<usize>>,
    }

    impl Deref for FakePackages {
        type Target = [FakePackage];
        fn deref(&self) -> &[FakePackage] {
            &self.packages
        }
    }

    impl Drop for FakePackages {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[derive(Clone)]
    pub(crate) struct FakeInstance {
        id: String,
        packages: Vec<FakePackage>,
        fail: Option<Step>,
        released: Rc<Cell<usize>>,
    }

    impl FakeInstance {
        fn check(&self, step: Step) -> Result<(), HRESULT> {
            if self.fail == Some(step) { Err(FAILURE) } else { Ok(()) }
        }
    }

    impl InstanceHandle for FakeInstance {
        type Package = FakePackage;
        type Packages = FakePackages;

        fn instance_id(&self) -> Result<String, HRESULT> {
            self.check(Step::Id).map(|_| self.id.clone())
        }
        fn display_name(&self) -> Result<String, HRESULT> {
            self.check(Step::Name).map(|_| format!("Visual Studio {}", self.id))
        }
        fn installation_version(&self) -> Result<String, HRESULT> {
            self.check(Step::Version).map(|_| "17.9.34607.119".into())
        }
        fn installation_path(&self) -> Result<PathBuf, HRESULT> {
            self.check(Step::Path)
                .map(|_| PathBuf::from(format!(r"C:\VS\{}", self.id)))
        }
        fn engine_path(&self) -> Result<PathBuf, HRESULT> {
            self.check(Step::Engine)
                .map(|_| PathBuf::from(r"C:\VS\Installer\resources\app\ServiceHub"))
        }
        fn packages(&self) -> Result<FakePackages, HRESULT> {
            self.check(Step::Packages)?;
            Ok(FakePackages {
                packages: self.packages.clone(),
                released: self.released.clone(),
            })
        }
    }

    pub(crate) struct FakeCursor {
        instances: std::vec::IntoIter<FakeInstance>,
        fail_next: bool,
    }

    impl InstanceCursor for FakeCursor {
        type Instance = FakeInstance;
        fn next_instance(&mut self) -> Result<Option<FakeInstance>, HRESULT> {
            if self.fail_next {
                return Err(FAILURE);
            }
            Ok(self.instances.next())
        }
    }

    /// An in-memory setup provider.
    pub(crate) struct FakeSource {
        instances: Vec<FakeInstance>,
        fail: Option<Step>,
        pub(crate) released: Rc<Cell<usize>>,
        pub(crate) resolved: Rc<Cell<usize>>,
    }

    impl FakeSource {
        pub(crate) fn new() -> Self {
            Self {
                instances: Vec::new(),
                fail: None,
                released: Rc::new(Cell::new(0)),
                resolved: Rc::new(Cell::new(0)),
            }
        }

        pub(crate) fn with_instance(mut self, id: &str, packages: &[&str]) -> Self {
            self.instances.push(FakeInstance {
                id: id.into(),
                packages: packages
                    .iter()
                    .map(|id| FakePackage {
                        id: (*id).into(),
                        fail: None,
                        resolved: self.resolved.clone(),
                    })
                    .collect(),
                fail: None,
                released: self.released.clone(),
            });
            self
        }

        /// Make `step` fail on the most recently added instance,
        /// or on the source itself for `Connect`, `Instances` and `Next`.
        pub(crate) fn failing_at(mut self, step: Step) -> Self {
            match step {
                Step::Connect | Step::Instances | Step::Next => self.fail = Some(step),
                Step::PackageReference | Step::PackageType => {
                    if let Some(package) = self
                        .instances
                        .last_mut()
                        .and_then(|instance| instance.packages.last_mut())
                    {
                        package.fail = Some(step);
                    }
                }
                _ => {
                    if let Some(instance) = self.instances.last_mut() {
                        instance.fail = Some(step);
                    }
                }
            }
            self
        }

        pub(crate) fn connect(self) -> Result<Self, HRESULT> {
            if self.fail == Some(Step::Connect) { Err(E_POINTER) } else { Ok(self) }
        }
    }

    impl SetupSource for FakeSource {
        type Instances = FakeCursor;
        fn instances(&self) -> Result<FakeCursor, HRESULT> {
            if self.fail == Some(Step::Instances) {
                return Err(FAILURE);
            }
            Ok(FakeCursor {
                instances: self.instances.clone().into_iter(),
                fail_next: self.fail == Some(Step::Next),
            })
        }
    }

    fn two_instances() -> FakeSource {
        FakeSource::new()
            .with_instance(
                "a1b2c3d4",
                &[
                    "Microsoft.VisualStudio.Product.Community",
                    "Microsoft.VisualStudio.Workload.NativeDesktop",
                    "Microsoft.VisualStudio.Component.VC.Tools.x86.x64",
                ],
            )
            .with_instance("e5f6a7b8", &["Microsoft.VisualStudio.Product.BuildTools"])
    }

    #[test]
    fn not_registered_is_empty() {
        let instances = enumerate_with(|| -> Result<FakeSource, HRESULT> { Err(REGDB_E_CLASSNOTREG) });
        assert_eq!(instances, Ok(Vec::new()));
    }

    #[test]
    fn other_connect_failures_are_errors() {
        let result = enumerate_with(|| FakeSource::new().failing_at(Step::Connect).connect());
        assert_eq!(result.unwrap_err().code(), E_POINTER);
    }

    #[test]
    fn empty_provider() {
        assert_eq!(enumerate_with(|| FakeSource::new().connect()), Ok(Vec::new()));
    }

    #[test]
    fn collects_in_provider_order() {
        let instances = enumerate_with(|| two_instances().connect()).unwrap();
        assert_eq!(instances.len(), 2);

        let first = &instances[0];
        assert_eq!(first.instance_id, "a1b2c3d4");
        assert_eq!(first.display_name, "Visual Studio a1b2c3d4");
        assert_eq!(first.version, "17.9.34607.119");
        assert_eq!(first.install_path, PathBuf::from(r"C:\VS\a1b2c3d4"));
        assert_eq!(first.packages.len(), 3);
        assert_eq!(first.packages[1].id, "Microsoft.VisualStudio.Workload.NativeDesktop");
        assert_eq!(first.packages[1].version, "17.9.34511.75");
        assert_eq!(first.packages[1].kind, "Component");

        assert_eq!(instances[1].instance_id, "e5f6a7b8");
        assert_eq!(instances[1].packages.len(), 1);
    }

    #[test]
    fn package_lists_are_released() {
        let source = two_instances();
        let released = source.released.clone();
        enumerate_with(|| source.connect()).unwrap();
        assert_eq!(released.get(), 2);
    }

    #[test]
    fn each_package_is_resolved_once() {
        let source = two_instances();
        let resolved = source.resolved.clone();
        let instances = enumerate_with(|| source.connect()).unwrap();
        let packages: usize = instances.iter().map(|i| i.packages.len()).sum();
        assert_eq!(packages, 4);
        assert_eq!(resolved.get(), packages);
    }

    #[test]
    fn repeated_enumeration_is_stable() {
        let source = two_instances();
        let first = enumerate_with(|| Ok::<_, HRESULT>(&source)).unwrap();
        let second = enumerate_with(|| Ok::<_, HRESULT>(&source)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn any_failing_step_fails_the_whole_call() {
        let steps = [
            Step::Instances,
            Step::Next,
            Step::Id,
            Step::Name,
            Step::Version,
            Step::Path,
            Step::Engine,
            Step::Packages,
            Step::PackageReference,
            Step::PackageType,
        ];
        for step in steps {
            let result = enumerate_with(|| two_instances().failing_at(step).connect());
            assert_eq!(result, Err(Error::from(FAILURE)), "{step:?}");
        }
    }

    #[test]
    fn failed_package_conversion_still_releases_the_list() {
        let source = two_instances().failing_at(Step::PackageType);
        let released = source.released.clone();
        assert!(enumerate_with(|| source.connect()).is_err());
        // First instance succeeded, second failed mid-list. Both lists released.
        assert_eq!(released.get(), 2);
    }

    impl<S: SetupSource> SetupSource for &S {
        type Instances = S::Instances;
        fn instances(&self) -> Result<S::Instances, HRESULT> {
            (**self).instances()
        }
    }
}
