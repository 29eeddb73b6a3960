fn main() {
    jobsh::shell_main();
}
